//! Client library and runtime for the Elk M1 alarm-and-integration panel
//!
//! Connects to an M1 Gold / M1 EZ8 panel over a serial port or the M1XEP
//! ethernet adaptor (`socket://host:port`), keeps a live mirror of the
//! panel's state (zones, areas, keypads, outputs, tasks, thermostats,
//! power-line devices, counters, custom settings, users), lets
//! applications issue control commands, and surfaces state changes
//! through callbacks or a broadcast event stream.
//!
//! ```no_run
//! use elkm1::{Elk, ElkConfig};
//!
//! # async fn demo() -> Result<(), elkm1::Error> {
//! let mut config = ElkConfig::new("socket://192.168.12.34:2101");
//! config.fastload_file = Some("fastload.json".into());
//! let elk = Elk::connect(config).await?;
//!
//! let mut events = elk.subscribe();
//! elk.arm(1, elkm1::entity::ArmLevel::Away, "1234")?;
//! while let Ok(event) = events.recv().await {
//!     println!("{:?} {} changed", event.kind(), event.number());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
mod dispatch;
pub mod elk;
pub mod entity;
pub mod error;
pub mod events;
pub mod panel;
pub mod proto;
pub mod queue;
mod scanner;
pub mod snapshot;
pub mod transport;

pub use config::{ElkConfig, EntityFilter};
pub use elk::{CallbackId, Elk, PanelEvent, RuntimeState};
pub use entity::EntityKind;
pub use error::{Error, FrameError};
pub use panel::PanelState;
pub use proto::{Frame, MessageKind};
