//! ora-codec - OpenRaster (.ora) layered image import and export
//!
//! The codec maps an ordered layer stack to the ORA zip layout and back.
//! Hosts plug in their own layer manager through [`document::LayerStack`].

pub mod config;
pub mod document;
pub mod file;

pub use config::OraConfig;
pub use document::{Document, Layer, LayerStack, StackLayer};
pub use file::{export_ora, import_ora, load_ora, FileError, ImportReport, LayerImportError};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the default tracing subscriber
///
/// `RUST_LOG` overrides the default `ora_codec=info` filter. Calling this
/// twice is harmless.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ora_codec=info,ora=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
