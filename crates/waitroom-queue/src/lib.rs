//! Tiered waiting queues for waitroom.
//!
//! Clients wait per destination in three tiers, [`Tier::Bypass`] ahead of
//! [`Tier::Priority`] ahead of [`Tier::Normal`], first-in first-out within a
//! tier. Entries whose client no longer resolves are evicted lazily by any
//! scan that touches them.
//!
//! # Components
//!
//! - [`TieredQueue`]: one destination's ordered membership with a version counter
//! - [`PositionCache`]: short-lived, version-gated position listings
//! - [`ConnectionStates`]: per-client destination, connecting flag and issue marker
//! - [`WaitingArea`]: owns all of the above and serves the admin queries
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use waitroom_core::{Client, ClientDirectory, ClientId, SharedClient};
//! use waitroom_queue::{Placement, Tier, WaitingArea};
//!
//! struct Player(ClientId);
//!
//! impl Client for Player {
//!     fn id(&self) -> ClientId { self.0 }
//!     fn display_name(&self) -> &str { "steve" }
//!     fn has_permission(&self, _permission: &str) -> bool { false }
//! }
//!
//! struct Everyone(SharedClient);
//!
//! impl ClientDirectory for Everyone {
//!     fn resolve(&self, id: ClientId) -> Option<SharedClient> {
//!         (self.0.id() == id).then(|| Arc::clone(&self.0))
//!     }
//!     fn waiting(&self) -> Vec<SharedClient> { vec![Arc::clone(&self.0)] }
//! }
//!
//! let player: SharedClient = Arc::new(Player(ClientId::random()));
//! let area = WaitingArea::builder()
//!     .directory(Arc::new(Everyone(Arc::clone(&player))))
//!     .build()
//!     .unwrap();
//!
//! let placement = area.place(&*player, "survival");
//! assert_eq!(placement, Placement::Queued { tier: Tier::Normal, position: Some(1) });
//! assert_eq!(area.queue_position(player.id()), Some(1));
//! ```
//!
//! # Feature Flags
//!
//! - `tracing`: log placements, removals and pruning
//! - `metrics`: report the `waitroom_queued_clients` gauge
//! - `serde`: serialize [`Tier`], [`TierPolicy`] and [`IssueKind`]

mod area;
mod connection;
mod positions;
mod tier;
mod tiered;

pub use area::{Placement, QueuedClientView, WaitingArea, WaitingAreaBuilder};
pub use connection::{BeginError, ConnectingGuard, ConnectionRecord, ConnectionStates, IssueKind};
pub use positions::{DEFAULT_POSITION_TTL, PositionCache, Positions};
pub use tier::{Tier, TierPolicy};
pub use tiered::TieredQueue;
