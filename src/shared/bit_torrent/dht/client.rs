//! One-shot KRPC client.
//!
//! Each query binds a fresh UDP socket, connects it to the queried node,
//! writes one datagram and reads one datagram. There is no retry here:
//! failures bubble up to the crawl scheduler which tracks per-node health.
use std::time::Duration;

use magnetite_primitives::info_hash::InfoHash;
use magnetite_primitives::NodeId;
use tokio::net::UdpSocket;
use tokio::time;
use tracing::debug;

use super::messages::{
    find_node_request, get_peers_request, parse_find_node_response, parse_get_peers_response,
    parse_sample_infohashes_response, sample_infohashes_request, GetPeersResponse, SampleInfohashesResponse,
};
use super::MAX_PACKET_SIZE;
use crate::core::error::Error;

/// A client for the three KRPC queries the crawler needs.
#[derive(Debug, Clone)]
pub struct KrpcClient {
    node_id: NodeId,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl KrpcClient {
    #[must_use]
    pub fn new(node_id: NodeId, connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            node_id,
            connect_timeout,
            request_timeout,
        }
    }

    /// Asks a node for the nodes closest to `target`.
    ///
    /// # Errors
    ///
    /// Will return a `Network` error on dial/read failures or timeouts and a
    /// `Protocol` error when the response is not a well-formed `find_node`
    /// response.
    pub async fn find_node(&self, address: &str, target: &NodeId) -> Result<Vec<String>, Error> {
        let datagram = self.round_trip(address, &find_node_request(&self.node_id, target)).await?;

        parse_find_node_response(&datagram)
    }

    /// Asks a node for peers of `info_hash`, or for closer nodes to ask.
    ///
    /// # Errors
    ///
    /// Will return a `Network` error on dial/read failures or timeouts and a
    /// `Protocol` error when the response is not a well-formed `get_peers`
    /// response.
    pub async fn get_peers(&self, address: &str, info_hash: &InfoHash) -> Result<GetPeersResponse, Error> {
        let datagram = self
            .round_trip(address, &get_peers_request(&self.node_id, info_hash))
            .await?;

        parse_get_peers_response(&datagram)
    }

    /// Asks a node for a sample of the infohashes it has seen (BEP 51).
    ///
    /// # Errors
    ///
    /// Will return a `Network` error on dial/read failures or timeouts and a
    /// `Protocol` error when the response is not a well-formed
    /// `sample_infohashes` response.
    pub async fn sample_infohashes(&self, address: &str, target: &NodeId) -> Result<SampleInfohashesResponse, Error> {
        let datagram = self
            .round_trip(address, &sample_infohashes_request(&self.node_id, target))
            .await?;

        parse_sample_infohashes_response(&datagram)
    }

    async fn round_trip(&self, address: &str, request: &[u8]) -> Result<Vec<u8>, Error> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;

        time::timeout(self.connect_timeout, socket.connect(address))
            .await
            .map_err(|_| Error::timed_out("udp connect"))??;

        debug!(target: "KRPC CLIENT", "sending {} bytes to {address}", request.len());
        time::timeout(self.request_timeout, socket.send(request))
            .await
            .map_err(|_| Error::timed_out("udp send"))??;

        let mut response_buffer = vec![0u8; MAX_PACKET_SIZE];
        let size = time::timeout(self.request_timeout, socket.recv(&mut response_buffer))
            .await
            .map_err(|_| Error::timed_out("udp read"))??;

        response_buffer.truncate(size);
        debug!(target: "KRPC CLIENT", "{size} bytes received from {address}");

        Ok(response_buffer)
    }
}
