/// gRPC surface of identity-service
///
/// Exports:
/// - qaengine: generated types, servers and clients from qaengine.proto
/// - AuthHandler / UserHandler: RPC implementations
/// - default_access_policy / load_access_policy: per-method role table
pub mod policy;
pub mod server;

pub mod qaengine {
    tonic::include_proto!("qaengine");
}

pub use policy::{default_access_policy, load_access_policy};
pub use server::{AuthHandler, UserHandler};
