//! Scene engines: globe marker clustering, the 3D force layout and the background swarm.
//!
//! Nothing here touches the DOM; the canvas components own an engine each and drive it
//! once per animation frame.

pub mod camera;
pub mod clustering;
pub mod force;
pub mod spatial;
pub mod swarm;
pub mod visual;

pub use camera::{Camera, ScreenPoint, Viewport};
pub use clustering::{Cluster, ClusterConfig, ClusteringEngine, Marker, MarkerSprite, MarkerVisual};
pub use force::{ForceLayout, GraphLink, GraphNode, LayoutConfig, LinkForce, LinkFrame, NodeFrame};
pub use swarm::{Swarm, SwarmConfig};
pub use visual::{Intent, Interaction, NodeState};
