//! Agent-facing JSON-RPC tool surface (C9, spec §6).
//!
//! Binds a `jsonrpsee` HTTP server on `127.0.0.1:{port}`, wraps it with the
//! shared-secret auth layer, and serves [`rpc::BouncerRpcServer`] over
//! [`bouncer_pipeline::PipelineContext`]. Mirrors `astrid-gateway`'s
//! `Server::builder().build(addr)` + `server.start(service.into_rpc())`
//! bootstrap.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod auth;
mod error;
mod help;
mod presigned;
mod rpc;
mod wire;

pub use auth::{AuthLayer, SHARED_SECRET_HEADER};
pub use error::{ServerError, ServerResult};
pub use rpc::{BouncerRpcServer, RpcImpl};
pub use wire::*;

use std::net::SocketAddr;

use bouncer_pipeline::PipelineContext;
use jsonrpsee::server::{Server, ServerHandle};
use tracing::info;

/// Bind address passed to `Server::builder` (spec §6 is silent on the
/// literal port; `0` lets the OS pick one, the way `astrid-gateway`'s
/// daemon does for its loopback socket).
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:0";

/// Start the RPC server, returning its handle and the address it bound to.
///
/// # Errors
///
/// Returns an error if the listener cannot bind.
pub async fn start(ctx: PipelineContext, shared_secret: String, bind_addr: Option<&str>) -> Result<(ServerHandle, SocketAddr), std::io::Error> {
    let middleware = tower::ServiceBuilder::new().layer(AuthLayer::new(shared_secret));

    let server = Server::builder()
        .set_http_middleware(middleware)
        .build(bind_addr.unwrap_or(DEFAULT_BIND_ADDR))
        .await
        .map_err(std::io::Error::other)?;

    let addr = server.local_addr().map_err(std::io::Error::other)?;
    let rpc_impl = RpcImpl::new(ctx);
    let handle = server.start(rpc_impl.into_rpc());
    info!(%addr, "bouncer RPC server listening");
    Ok((handle, addr))
}
