//! WASM bindings for truckalloc
//!
//! This module provides JavaScript-friendly APIs for browser front-ends that
//! collect node demands in a form and render the resulting tables.

use wasm_bindgen::prelude::*;

use crate::allocator::Allocator;
use crate::config::{AllocationConfig, Preset};
use crate::demand::DemandVector;
use crate::report::AllocationReport;

/// Allocate trucks for the given demands and return the report as JSON.
///
/// `config_json` overrides the standard fleet when present. A missing
/// allocation comes back as `{status: "infeasible"}` rather than an error.
#[wasm_bindgen]
pub fn allocate(demands: Vec<i64>, config_json: Option<String>) -> Result<JsValue, JsValue> {
    let config = match config_json {
        Some(json) => serde_json::from_str::<AllocationConfig>(&json).map_err(|e| JsValue::from_str(&e.to_string()))?,
        None => AllocationConfig::standard(),
    };
    let demands = DemandVector::new(demands).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let allocator = Allocator::new(config).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let result = match allocator.allocate(&demands) {
        Ok(report) => AllocateResult {
            status: "optimal".to_string(),
            report: Some(report),
        },
        Err(e) if e.is_no_allocation() => AllocateResult {
            status: "infeasible".to_string(),
            report: None,
        },
        Err(e) => return Err(JsValue::from_str(&e.to_string())),
    };

    serde_wasm_bindgen::to_value(&result).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Return a built-in configuration as JSON, `standard` when the name is unknown
#[wasm_bindgen]
pub fn preset_config(name: &str) -> JsValue {
    let config = name.parse::<Preset>().unwrap_or(Preset::Standard).config();
    serde_wasm_bindgen::to_value(&config).unwrap_or(JsValue::NULL)
}

#[derive(serde::Serialize)]
struct AllocateResult {
    status: String,
    report: Option<AllocationReport>,
}
