// src/classifier.rs
use anyhow::{anyhow, Context, Result};
use libloading::Library;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::ffi::CString;
use std::os::raw::{c_char, c_double, c_int};
use crate::brainflow::library_path;
use crate::drivers::bands::FEATURE_VECTOR_LEN;
/// Maps a band-power feature vector to one concentration score.
pub trait ConcentrationModel {
    fn prepare(&mut self) -> Result<()>;
    fn predict(&mut self, features: &[f64]) -> Result<f64>;
    fn release(&mut self) -> Result<()>;
}
/// Which model the classification loop builds on every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    BandRatio,
    BrainFlow { metric: i32, classifier: i32 },
}
impl Default for ModelKind {
    fn default() -> Self {
        ModelKind::BandRatio
    }
}
/// `MLModule` metric id for mindfulness.
pub const MINDFULNESS_METRIC: i32 = 0;
/// `MLModule` built-in classifier id; needs no model file.
pub const DEFAULT_CLASSIFIER: i32 = 0;
impl ModelKind {
    pub fn brainflow_default() -> Self {
        ModelKind::BrainFlow {
            metric: MINDFULNESS_METRIC,
            classifier: DEFAULT_CLASSIFIER,
        }
    }
    pub fn build(self) -> Box<dyn ConcentrationModel> {
        match self {
            ModelKind::BandRatio => Box::new(BandRatioModel::default()),
            ModelKind::BrainFlow { metric, classifier } => {
                Box::new(BrainFlowModel::new(metric, classifier))
            }
        }
    }
    pub fn label(&self) -> &'static str {
        match self {
            ModelKind::BandRatio => "Band ratio",
            ModelKind::BrainFlow { .. } => "BrainFlow MLModel",
        }
    }
}
/// Builds a fresh model, runs one prediction, and always releases it.
pub fn score_once(kind: ModelKind, features: &[f64]) -> Result<f64> {
    let mut model = kind.build();
    model.prepare()?;
    let score = model.predict(features);
    let released = model.release();
    let score = score?;
    released?;
    Ok(score)
}
/// Engagement index `beta / (alpha + theta)` squashed into `[0, 1)`.
///
/// Reads the averages half of the feature vector (delta, theta, alpha, beta,
/// gamma, then their deviations).
#[derive(Default)]
pub struct BandRatioModel {
    prepared: bool,
}
impl ConcentrationModel for BandRatioModel {
    fn prepare(&mut self) -> Result<()> {
        self.prepared = true;
        Ok(())
    }
    fn predict(&mut self, features: &[f64]) -> Result<f64> {
        if !self.prepared {
            return Err(anyhow!("band ratio model used before prepare"));
        }
        if features.len() != FEATURE_VECTOR_LEN {
            return Err(anyhow!(
                "expected {} band power features, got {}",
                FEATURE_VECTOR_LEN,
                features.len()
            ));
        }
        let (theta, alpha, beta) = (features[1], features[2], features[3]);
        let slow = alpha + theta;
        if slow <= f64::EPSILON {
            return Ok(if beta > 0.0 { 1.0 - f64::EPSILON } else { 0.0 });
        }
        let ratio = (beta / slow).max(0.0);
        Ok(ratio / (1.0 + ratio))
    }
    fn release(&mut self) -> Result<()> {
        self.prepared = false;
        Ok(())
    }
}
#[derive(Serialize)]
struct BrainFlowModelParams {
    metric: i32,
    classifier: i32,
    file: String,
    other_info: String,
    output_name: String,
    max_array_size: i32,
}
struct MlApi {
    #[allow(dead_code)]
    lib: Library,
    prepare: unsafe extern "C" fn(*const c_char) -> c_int,
    predict: unsafe extern "C" fn(*mut c_double, c_int, *mut c_double, *mut c_int, *const c_char)
        -> c_int,
    release: unsafe extern "C" fn(*const c_char) -> c_int,
}
impl MlApi {
    fn load() -> Result<Self> {
        let path = library_path("MLModule");
        let lib = unsafe { Library::new(&path) }
            .with_context(|| format!("{} not found in working directory", path.to_string_lossy()))?;
        unsafe {
            Ok(Self {
                prepare: *lib.get(b"prepare\0")?,
                predict: *lib.get(b"predict\0")?,
                release: *lib.get(b"release\0")?,
                lib,
            })
        }
    }
    fn instance() -> Result<&'static MlApi> {
        static API: OnceCell<MlApi> = OnceCell::new();
        API.get_or_try_init(Self::load)
    }
}
fn check(code: c_int, ctx: &str) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(anyhow!("{ctx} failed (BrainFlow code {code})"))
    }
}
/// BrainFlow `MLModule` classifier selected by its metric and classifier ids.
pub struct BrainFlowModel {
    params: BrainFlowModelParams,
    json: Option<CString>,
}
impl BrainFlowModel {
    pub fn new(metric: i32, classifier: i32) -> Self {
        Self {
            params: BrainFlowModelParams {
                metric,
                classifier,
                file: String::new(),
                other_info: String::new(),
                output_name: String::new(),
                max_array_size: 8192,
            },
            json: None,
        }
    }
    fn params_json(&self) -> Result<CString> {
        let json = serde_json::to_string(&self.params)?;
        CString::new(json).context("failed to encode model params to C string")
    }
}
impl ConcentrationModel for BrainFlowModel {
    fn prepare(&mut self) -> Result<()> {
        let api = MlApi::instance()?;
        let json = self.params_json()?;
        check(unsafe { (api.prepare)(json.as_ptr()) }, "prepare")?;
        self.json = Some(json);
        Ok(())
    }
    fn predict(&mut self, features: &[f64]) -> Result<f64> {
        let json = self
            .json
            .as_ref()
            .ok_or_else(|| anyhow!("MLModel used before prepare"))?;
        let api = MlApi::instance()?;
        let mut data = features.to_vec();
        let mut output = [0.0f64; 8];
        let mut output_len: c_int = 0;
        check(
            unsafe {
                (api.predict)(
                    data.as_mut_ptr(),
                    data.len() as c_int,
                    output.as_mut_ptr(),
                    &mut output_len as *mut c_int,
                    json.as_ptr(),
                )
            },
            "predict",
        )?;
        if output_len < 1 {
            return Err(anyhow!("predict returned no values"));
        }
        Ok(output[0])
    }
    fn release(&mut self) -> Result<()> {
        if let Some(json) = self.json.take() {
            let api = MlApi::instance()?;
            check(unsafe { (api.release)(json.as_ptr()) }, "release")?;
        }
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn with_spread(avg: [f64; 5]) -> Vec<f64> {
        avg.iter().chain(&[0.3; 5]).copied().collect()
    }
    #[test]
    fn band_ratio_grows_with_beta() {
        let relaxed = score_once(ModelKind::BandRatio, &with_spread([5.0, 4.0, 12.0, 2.0, 1.0])).unwrap();
        let focused = score_once(ModelKind::BandRatio, &with_spread([5.0, 2.0, 3.0, 10.0, 1.0])).unwrap();
        assert!(focused > relaxed);
        assert!((0.0..1.0).contains(&relaxed));
        assert!((0.0..1.0).contains(&focused));
        // beta == alpha + theta sits at the midpoint
        let even = score_once(ModelKind::BandRatio, &with_spread([0.0, 1.0, 1.0, 2.0, 0.0])).unwrap();
        assert!((even - 0.5).abs() < 1e-12);
    }
    #[test]
    fn band_ratio_rejects_wrong_feature_count() {
        assert!(score_once(ModelKind::BandRatio, &[1.0, 2.0]).is_err());
        // averages alone are not enough
        assert!(score_once(ModelKind::BandRatio, &[0.1, 0.2, 0.3, 0.3, 0.1]).is_err());
    }
    #[test]
    fn predict_requires_prepare() {
        let mut model = BandRatioModel::default();
        assert!(model.predict(&[0.0; 10]).is_err());
        model.prepare().unwrap();
        assert_eq!(model.predict(&[0.0; 10]).unwrap(), 0.0);
        model.release().unwrap();
        assert!(model.predict(&[0.0; 10]).is_err());
    }
    #[test]
    fn model_params_match_brainflow_json() {
        let ModelKind::BrainFlow { metric, classifier } = ModelKind::brainflow_default() else {
            panic!("not a BrainFlow model");
        };
        let model = BrainFlowModel::new(metric, classifier);
        let json: serde_json::Value =
            serde_json::from_str(model.params_json().unwrap().to_str().unwrap()).unwrap();
        // mindfulness with the built-in classifier, no model file needed
        assert_eq!(json["metric"], 0);
        assert_eq!(json["classifier"], 0);
        assert_eq!(json["file"], "");
        assert_eq!(json["max_array_size"], 8192);
    }
    #[test]
    fn model_kind_round_trips_through_settings_json() {
        let kind = ModelKind::brainflow_default();
        let text = serde_json::to_string(&kind).unwrap();
        assert_eq!(serde_json::from_str::<ModelKind>(&text).unwrap(), kind);
    }
}
