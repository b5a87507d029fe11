pub mod config;
pub mod footprint;
pub mod matrix;
pub mod stream;
pub mod util;
pub mod world;
pub mod zone;

pub use config::Config;
pub use footprint::{BinStore, Column, Columns, FootprintBin, Imbalance, ZoneProfile};
pub use matrix::{MatrixError, TransformError, TransformationMatrix};
pub use stream::{Batch, StreamError, StreamMessage};
pub use world::{ListenerId, WorldSpace};
pub use zone::{Draft, FocusZone, ProfileLevel, RenderPosition, Side, ZoneCoordinator, ZoneRect};
