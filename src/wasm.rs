//! WASM bindings for Membrane Core.
//!
//! This module exposes the dispatch contract to JavaScript as JSON strings,
//! so a browser front-end can drive every solver without mirroring Rust types.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { dispatch_json, solver_ids } from 'membrane_core';
//!
//! await init();
//!
//! const request = {
//!   params: { ions: [{ symbol: 'K', intra: 140, extra: 5, valence: 1 }] },
//!   config: { temperature_K: 310 },
//! };
//!
//! const result = JSON.parse(dispatch_json('nernst', JSON.stringify(request)));
//! if (result.kind) {
//!   console.error(result.message);
//! }
//! ```

use wasm_bindgen::prelude::*;

use crate::dispatch::{dispatch, DispatchError};
use crate::domain::{Locale, SolverId, SolverRequest};
use crate::error::{MembraneError, Result};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Run a solver on a JSON request.
///
/// # Arguments
/// * `solver_id` - One of the identifiers returned by `solver_ids()`
/// * `request_json` - `{ params, config? }` as a JSON string
///
/// # Returns
/// The result envelope as JSON, or `{ solver_id, kind, message }` when the
/// request fails.
#[wasm_bindgen]
pub fn dispatch_json(solver_id: &str, request_json: &str) -> String {
    let outcome = match SolverRequest::from_json(request_json) {
        Ok(request) => dispatch(solver_id, &request).map_or_else(|e| to_json(&e), |r| to_json(&r)),
        Err(e) => to_json(&DispatchError::new(solver_id, e, Locale::En)),
    };

    outcome.unwrap_or_else(|e| {
        serde_json::json!({"solver_id": solver_id, "kind": e.kind(), "message": e.to_string()})
            .to_string()
    })
}

/// Identifiers of every registered solver.
#[wasm_bindgen]
pub fn solver_ids() -> Vec<String> {
    SolverId::ALL.iter().map(|id| id.as_str().to_string()).collect()
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(MembraneError::from)
}
