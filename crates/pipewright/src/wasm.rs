//! WebAssembly bindings for Pipewright
//!
//! Wraps the orchestrator for a browser host. Renders and errors cross the
//! boundary as JSON strings.

use wasm_bindgen::prelude::*;

use crate::core::{parse_catalog, split_configurations, EditorConfig, LayoutMode, StaticReferenceData};
use crate::plugins::{adapter_at_offset, adapter_names, DiagramEvent, Orchestrator};

/// Initialize WASM module
///
/// Sets up panic hooks and logging for better error messages in the browser.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    use crate::core::logging::init_logging;
    let _ = init_logging(Some("info"), None);
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Editor session for one document
#[wasm_bindgen]
pub struct WasmEditor {
    orchestrator: Orchestrator,
}

#[wasm_bindgen]
impl WasmEditor {
    /// Create an editor; `config` is an optional JSON editor configuration
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<WasmEditor, JsValue> {
        let config = match config {
            Some(json) => EditorConfig::from_json(&json).map_err(js_error)?,
            None => EditorConfig::default(),
        };
        Ok(Self {
            orchestrator: Orchestrator::new(config),
        })
    }

    /// Current markup text, including committed placements
    pub fn text(&self) -> String {
        self.orchestrator.text().to_string()
    }

    pub fn state(&self) -> String {
        format!("{:?}", self.orchestrator.state()).to_lowercase()
    }

    pub fn last_error(&self) -> Option<String> {
        self.orchestrator.last_error().map(str::to_string)
    }

    pub fn selected_adapter(&self) -> Option<String> {
        self.orchestrator.selected_adapter().map(str::to_string)
    }

    /// The text editor content changed; returns the render as JSON
    pub fn text_changed(&mut self, text: &str) -> Result<String, JsValue> {
        let render = self.orchestrator.text_changed(text).map_err(js_error)?;
        to_js(render)
    }

    /// Apply a diagram event given as JSON, e.g. `{"event":"move","name":"A","x":1,"y":2}`
    pub fn handle_event(&mut self, event: &str) -> Result<String, JsValue> {
        let event: DiagramEvent = serde_json::from_str(event).map_err(js_error)?;
        let render = self.orchestrator.handle_event(event).map_err(js_error)?;
        to_js(render)
    }

    /// Recompute and commit every placement; `mode` is "vertical" or "horizontal"
    pub fn relayout(&mut self, mode: &str) -> Result<String, JsValue> {
        let mode: LayoutMode = mode.parse().map_err(|e: String| JsValue::from_str(&e))?;
        let render = self.orchestrator.relayout(mode).map_err(js_error)?;
        to_js(render)
    }

    pub fn select_adapter(&mut self, name: &str) -> Result<String, JsValue> {
        let render = self.orchestrator.select_adapter(name).map_err(js_error)?;
        to_js(render)
    }

    pub fn select_adapter_at(&mut self, offset: usize) -> Result<String, JsValue> {
        let render = self.orchestrator.select_adapter_at(offset).map_err(js_error)?;
        to_js(render)
    }

    /// Hand over reference data fetched by the host
    ///
    /// `catalog` is a JSON array of stage kinds; `configurations` is the raw
    /// multi-configuration response.
    pub fn load_reference_data(
        &mut self,
        schema: Option<String>,
        catalog: Option<String>,
        configurations: Option<String>,
    ) -> Result<(), JsValue> {
        let data = StaticReferenceData {
            schema,
            catalog: match catalog {
                Some(json) => parse_catalog(&json).map_err(js_error)?,
                None => Vec::new(),
            },
            configurations: configurations
                .map(|text| split_configurations(&text))
                .unwrap_or_default(),
        };
        self.orchestrator.load_reference_data(&data, &data, &data);
        Ok(())
    }

    /// Names of the saved configurations, as a JSON array
    pub fn configuration_names(&self) -> Result<String, JsValue> {
        let names: Vec<&str> = self
            .orchestrator
            .session()
            .saved_configurations
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        to_js(&names)
    }

    pub fn open_configuration(&mut self, name: &str) -> Result<String, JsValue> {
        let render = self.orchestrator.open_configuration(name).map_err(js_error)?;
        to_js(render)
    }
}

/// Adapter names in document order, as a JSON array
#[wasm_bindgen]
pub fn list_adapters(text: &str) -> Result<String, JsValue> {
    to_js(&adapter_names(text))
}

/// Adapter enclosing a cursor offset
#[wasm_bindgen]
pub fn adapter_at_cursor(text: &str, offset: usize) -> Option<String> {
    adapter_at_offset(text, offset)
}

/// Markup tree of a document as JSON
#[wasm_bindgen]
pub fn markup_tree(text: &str) -> Result<String, JsValue> {
    let tree = crate::core::to_tree(text).map_err(js_error)?;
    tree.to_json().map_err(js_error)
}
