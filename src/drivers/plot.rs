use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use crate::drivers::fft::FrequencySpectrum;
use crate::drivers::pipeline::RefreshFrame;
use crate::drivers::SignalError;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
    /// Caption, axis labels and legend; these need a system font.
    pub annotate: bool,
}
impl Default for PlotStyle {
    fn default() -> Self {
        // same colors as the on-screen monitor traces
        Self {
            width: 1200,
            height: 500,
            background: RGBColor(10, 10, 10),
            palette: vec![
                CYAN,
                MAGENTA,
                GREEN,
                RED,
                BLUE,
                WHITE,
                YELLOW,
                RGBColor(135, 100, 35),
            ],
            annotate: true,
        }
    }
}
/// Renders the raw traces of a refresh frame, one line per channel.
pub fn render_waveform_png(frame: &RefreshFrame, style: PlotStyle) -> Result<Vec<u8>, SignalError> {
    let Some(first) = frame.raw.first().filter(|c| !c.is_empty()) else {
        return Err(SignalError::Plot("frame has no samples".into()));
    };
    let x_start = frame.first_sample as f64;
    let x_end = x_start + first.len() as f64;
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let (y_min, y_max) = frame
            .raw
            .iter()
            .flat_map(|c| c.iter().copied())
            .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let y_bounds = if (y_max - y_min).abs() < f64::EPSILON {
            (y_min - 50.0, y_max + 50.0)
        } else {
            (y_min, y_max)
        };
        let mut builder = ChartBuilder::on(&root);
        builder.margin(10);
        if style.annotate {
            builder
                .caption("EEG Channels", ("sans-serif", 20).into_font().color(&WHITE))
                .set_label_area_size(LabelAreaPosition::Left, 55)
                .set_label_area_size(LabelAreaPosition::Bottom, 40);
        }
        let mut chart = builder.build_cartesian_2d(x_start..x_end, y_bounds.0..y_bounds.1)?;
        if style.annotate {
            chart
                .configure_mesh()
                .light_line_style(&WHITE.mix(0.1))
                .draw()?;
        }
        for (idx, channel) in frame.raw.iter().enumerate() {
            let color = style.palette[idx % style.palette.len()];
            let series = channel
                .iter()
                .enumerate()
                .map(|(i, v)| (x_start + i as f64, *v));
            chart
                .draw_series(LineSeries::new(series, &color))?
                .label(format!("Channel{}", idx + 1))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        if style.annotate {
            chart
                .configure_series_labels()
                .border_style(&WHITE.mix(0.2))
                .background_style(&style.background)
                .draw()?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
pub fn render_spectrum_png(
    spectrum: &FrequencySpectrum,
    style: PlotStyle,
) -> Result<Vec<u8>, SignalError> {
    if spectrum.magnitudes.is_empty() {
        return Err(SignalError::Plot("spectrum has no magnitudes".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let y_max = spectrum
            .magnitudes
            .iter()
            .flat_map(|c| c.iter().copied())
            .fold(0.0f64, |acc, v| acc.max(v))
            .max(1e-3);
        let mut builder = ChartBuilder::on(&root);
        builder.margin(10);
        if style.annotate {
            builder
                .caption("PSD", ("sans-serif", 20).into_font().color(&WHITE))
                .set_label_area_size(LabelAreaPosition::Left, 55)
                .set_label_area_size(LabelAreaPosition::Bottom, 40);
        }
        let mut chart = builder.build_cartesian_2d(
            0f64..spectrum.frequencies_hz.last().copied().unwrap_or(1.0),
            0f64..y_max,
        )?;
        if style.annotate {
            chart
                .configure_mesh()
                .light_line_style(&WHITE.mix(0.1))
                .draw()?;
        }
        for (idx, mags) in spectrum.magnitudes.iter().enumerate() {
            let color = style.palette[idx % style.palette.len()];
            let series = spectrum
                .frequencies_hz
                .iter()
                .copied()
                .zip(mags.iter().copied());
            chart
                .draw_series(LineSeries::new(series, &color))?
                .label(
                    spectrum
                        .channel_labels
                        .get(idx)
                        .cloned()
                        .unwrap_or_else(|| format!("Channel{}", idx + 1)),
                )
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        if style.annotate {
            chart
                .configure_series_labels()
                .border_style(&WHITE.mix(0.2))
                .background_style(&style.background)
                .draw()?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, SignalError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| SignalError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
