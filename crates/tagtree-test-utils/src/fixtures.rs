//! Canned catalogs.
//!
//! [`MODEL_CATALOG`] is a small but realistic model zoo: families, a
//! container base, quantization and port fields, and concrete presets.

use tagtree_core::{RawIndex, Registry, RegistryOptions};

/// A model catalog exercising multi-parent inheritance and field detection.
pub const MODEL_CATALOG: &str = r#"{
    "meta": {"tags": [], "name": "Meta"},
    "field": {"tags": ["meta"], "name": "Field"},
    "quantization": {"tags": ["field"], "name": "Quantization"},
    "q4f16_ft": {"tags": ["quantization"], "name": "Q4F16 FT"},
    "q8f16": {"tags": ["quantization"], "name": "Q8F16"},
    "port": {"tags": ["field"], "name": "Port"},
    "container": {
        "tags": [],
        "name": "Container",
        "docker_image": "dustynv/base:r36",
        "http_port": "port",
        "links": {"docs": {"url": "https://example.com/containers", "color": "blue", "name": "Docs"}}
    },
    "llm": {"tags": [], "name": "LLM", "pin": true},
    "mlc": {"tags": ["container"], "name": "MLC", "docker_image": "dustynv/mlc:r36", "quant": "quantization"},
    "llama": {"tags": ["llm"], "name": "Llama", "context_length": 8192},
    "llama-3.1-8b": {"tags": ["llama", "mlc"], "name": "Llama 3.1 8B", "context_length": 131072},
    "llama-3.2-1b": {"tags": ["llama", "mlc"], "name": "Llama 3.2 1B"},
    "whisper": {"tags": ["container"], "name": "Whisper", "offline": true}
}"#;

/// The same catalog with dangling tags and a two-node cycle.
pub const BROKEN_CATALOG: &str = r#"{
    "base": {"tags": []},
    "orphan": {"tags": ["missing-parent"]},
    "partial": {"tags": ["base", "missing-parent"], "name": "Partial"},
    "ping": {"tags": ["pong"]},
    "pong": {"tags": ["ping"]}
}"#;

/// Parse [`MODEL_CATALOG`].
pub fn model_index() -> RawIndex {
    RawIndex::from_json_str(MODEL_CATALOG).expect("fixture catalog is valid JSON")
}

/// Build a registry from [`MODEL_CATALOG`] with default options.
pub fn model_registry() -> Registry {
    Registry::with_options(model_index(), RegistryOptions::default())
        .expect("fixture catalog is acyclic")
}
