//! Mock confidential-computation service.
//!
//! Stands in for the external decryption gateway during development and
//! testing. It mints opaque ciphertext handles for plaintext values,
//! accepts reveal requests fire-and-forget, and later delivers plaintext
//! callbacks, exactly once per request, in whatever order the caller
//! drains them. Nothing here is cryptography; the point is the asynchrony
//! and the correlation contract, not confidentiality.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;
use tracing::{debug, info, warn};

use clearbid_types::{Address, CiphertextHandle, RequestId, RevealRequest};

/// Errors produced by the mock gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request referenced a handle this gateway never minted.
    #[error("unknown ciphertext handle {0}")]
    UnknownHandle(CiphertextHandle),

    /// The request id was already accepted.
    #[error("duplicate reveal request {0}")]
    DuplicateRequest(RequestId),
}

/// A decryption result ready for delivery.
#[derive(Debug, Clone)]
pub struct PendingDelivery {
    pub request_id: RequestId,
    pub plaintexts: Vec<u64>,
}

/// In-memory gateway double.
#[derive(Debug, Default)]
pub struct MockGateway {
    /// Plaintexts behind minted handles.
    plaintexts: HashMap<CiphertextHandle, u64>,
    next_nonce: u64,
    /// Accepted requests not yet delivered.
    queue: VecDeque<PendingDelivery>,
    /// Everything ever accepted, for exactly-once delivery.
    accepted: HashSet<RequestId>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a handle for a plaintext value, as the client-side encryption
    /// SDK would.
    pub fn encrypt(&mut self, owner: &Address, value: u64) -> CiphertextHandle {
        let handle = CiphertextHandle::derive(owner, self.next_nonce);
        self.next_nonce += 1;
        self.plaintexts.insert(handle, value);
        debug!(owner = hex::encode(owner), %handle, "minted ciphertext handle");
        handle
    }

    /// Mint the (quantity, price) handle pair for one bid submission.
    pub fn encrypt_bid(
        &mut self,
        owner: &Address,
        quantity: u64,
        price: u64,
    ) -> (CiphertextHandle, CiphertextHandle) {
        (self.encrypt(owner, quantity), self.encrypt(owner, price))
    }

    /// Accept a reveal request. Resolves the handles immediately but
    /// delivers nothing until the queue is drained.
    pub fn accept(&mut self, request: &RevealRequest) -> Result<(), GatewayError> {
        if self.accepted.contains(&request.request_id) {
            warn!(request_id = request.request_id, "reveal request redelivered to gateway");
            return Err(GatewayError::DuplicateRequest(request.request_id));
        }

        let mut plaintexts = Vec::with_capacity(request.handles.len());
        for handle in &request.handles {
            let value = self
                .plaintexts
                .get(handle)
                .copied()
                .ok_or(GatewayError::UnknownHandle(*handle))?;
            plaintexts.push(value);
        }
        self.accepted.insert(request.request_id);

        info!(
            request_id = request.request_id,
            bid_id = request.bid_id,
            handles = request.handles.len(),
            "accepted reveal request"
        );
        self.queue.push_back(PendingDelivery {
            request_id: request.request_id,
            plaintexts,
        });
        Ok(())
    }

    /// Deliver every queued callback in acceptance order.
    pub fn flush<F>(&mut self, mut deliver: F)
    where
        F: FnMut(RequestId, &[u64]),
    {
        while let Some(delivery) = self.queue.pop_front() {
            debug!(request_id = delivery.request_id, "delivering reveal callback");
            deliver(delivery.request_id, &delivery.plaintexts);
        }
    }

    /// Deliver every queued callback newest-first. The service makes no
    /// ordering promise; tests use this to exercise out-of-order arrival.
    pub fn flush_reversed<F>(&mut self, mut deliver: F)
    where
        F: FnMut(RequestId, &[u64]),
    {
        while let Some(delivery) = self.queue.pop_back() {
            debug!(request_id = delivery.request_id, "delivering reveal callback");
            deliver(delivery.request_id, &delivery.plaintexts);
        }
    }

    /// Whether this gateway minted the handle.
    pub fn knows(&self, handle: &CiphertextHandle) -> bool {
        self.plaintexts.contains_key(handle)
    }

    /// Callbacks waiting to be delivered.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
