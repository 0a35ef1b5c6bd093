//! WASM bindings for IBIS Core.
//!
//! This module exposes the parsed model graph and derived K-tables to
//! JavaScript, for browser-based model viewers.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmIbis } from 'ibis_core';
//!
//! await init();
//!
//! const ibis = new WasmIbis(await file.text());
//! for (const model of ibis.model_names()) {
//!   // [t0, k0, t1, k1, ...]
//!   const ku = ibis.pullup_k(model, "rising", "typ");
//! }
//! ```

use wasm_bindgen::prelude::*;

use crate::error::IbisError;
use crate::ibis::{Direction, Ibis, KTables, Speed};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn js_error(err: IbisError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn wasm_error(message: String) -> JsValue {
    js_error(IbisError::WasmError { message })
}

/// A parsed IBIS file.
#[wasm_bindgen]
pub struct WasmIbis {
    ibis: Ibis,
}

#[wasm_bindgen]
impl WasmIbis {
    /// Parse IBIS text and derive K-tables for every driving model.
    ///
    /// # Example
    /// ```javascript
    /// const ibis = new WasmIbis(text);
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(text: &str) -> Result<WasmIbis, JsValue> {
        let ibis = Ibis::parse(text).map_err(js_error)?;
        Ok(WasmIbis { ibis })
    }

    /// Component names in file order.
    #[wasm_bindgen]
    pub fn component_names(&self) -> Vec<String> {
        self.ibis.components.keys().cloned().collect()
    }

    /// Model names as written in the file.
    #[wasm_bindgen]
    pub fn model_names(&self) -> Vec<String> {
        self.ibis.models.values().map(|m| m.name.clone()).collect()
    }

    /// Pin names of the selected component.
    #[wasm_bindgen]
    pub fn pin_names(&self) -> Result<Vec<String>, JsValue> {
        let component = self.ibis.component().map_err(js_error)?;
        Ok(component.pins.keys().cloned().collect())
    }

    /// Select another component.
    #[wasm_bindgen]
    pub fn select_device(&mut self, name: &str) -> Result<(), JsValue> {
        self.ibis.select_device(name).map_err(js_error)
    }

    /// Pullup multiplier as a flat `[t0, k0, t1, k1, ...]` array.
    #[wasm_bindgen]
    pub fn pullup_k(&self, model: &str, direction: &str, speed: &str) -> Result<Vec<f64>, JsValue> {
        self.k_table(model, direction, speed, |m| m.pullup_k.as_ref())
    }

    /// Pulldown multiplier as a flat `[t0, k0, t1, k1, ...]` array.
    #[wasm_bindgen]
    pub fn pulldown_k(&self, model: &str, direction: &str, speed: &str) -> Result<Vec<f64>, JsValue> {
        self.k_table(model, direction, speed, |m| m.pulldown_k.as_ref())
    }
}

impl WasmIbis {
    fn k_table(
        &self,
        model: &str,
        direction: &str,
        speed: &str,
        pick: impl Fn(&crate::ibis::Model) -> Option<&KTables>,
    ) -> Result<Vec<f64>, JsValue> {
        let direction: Direction = direction.parse().map_err(wasm_error)?;
        let speed: Speed = speed.parse().map_err(wasm_error)?;
        let model = self.ibis.model(model).map_err(js_error)?;
        let tables = pick(model).ok_or_else(|| {
            js_error(IbisError::Uncharacterized {
                model: model.name.clone(),
            })
        })?;
        Ok(tables[direction][speed]
            .iter()
            .flat_map(|&(t, k)| [t, k])
            .collect())
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
