//! Collaborator ports: the narrow interfaces the core calls out through.
//!
//! Each port has one fixed request/response shape; the core never branches
//! on response shape. In-memory implementations back the tests and dev
//! hosting.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use stockflow_core::TenantId;
use stockflow_fulfillment::DemandOrderId;
use stockflow_picking::StockMovement;
use stockflow_receiving::{CommitmentId, CommitmentLine};
use stockflow_routing::{GeoPoint, VehicleId};

/// Collaborator call failure.
#[derive(Debug, Error)]
pub enum PortError {
    /// The collaborator processed the request and said no.
    #[error("collaborator rejected the request: {0}")]
    Rejected(String),

    /// The collaborator could not be reached or did not answer in time.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// The requested master-data record does not exist.
    #[error("collaborator has no such record: {0}")]
    NotFound(String),
}

/// Vehicle master data as served by the fleet collaborator. Read-only here.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleProfile {
    pub driver: Option<String>,
    pub max_weight_kg: f64,
    pub max_volume_cbm: f64,
}

/// Delivery data of one order, as served by the order-store collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDeliveryInfo {
    pub address: String,
    pub coords: Option<GeoPoint>,
    pub weight_kg: f64,
    pub volume_cbm: f64,
}

/// Purchase commitments, read for notice reconciliation.
pub trait CommitmentSource: Send + Sync {
    fn get_commitment(
        &self,
        tenant_id: TenantId,
        commitment_id: CommitmentId,
    ) -> Result<Vec<CommitmentLine>, PortError>;
}

/// Vehicle master data, read for route planning.
pub trait VehicleDirectory: Send + Sync {
    fn get_vehicle_profile(
        &self,
        tenant_id: TenantId,
        vehicle_id: VehicleId,
    ) -> Result<VehicleProfile, PortError>;
}

/// Delivery address/coordinates/load of an order, read for route stops.
pub trait DeliveryInfoSource: Send + Sync {
    fn get_order_delivery_info(
        &self,
        tenant_id: TenantId,
        order_id: DemandOrderId,
    ) -> Result<OrderDeliveryInfo, PortError>;
}

/// Inventory ledger signals. The core tells the ledger when stock must be
/// committed (reserved), released (a reservation undone) or deducted; it
/// never posts ledger entries itself.
pub trait StockLedger: Send + Sync {
    fn commit_stock(&self, tenant_id: TenantId, lines: &[StockMovement]) -> Result<(), PortError>;

    fn release_stock(&self, tenant_id: TenantId, lines: &[StockMovement]) -> Result<(), PortError>;

    fn deduct_stock(&self, tenant_id: TenantId, lines: &[StockMovement]) -> Result<(), PortError>;
}

/// In-memory commitment store.
#[derive(Debug, Default)]
pub struct InMemoryCommitments {
    commitments: Mutex<HashMap<(TenantId, CommitmentId), Vec<CommitmentLine>>>,
}

impl InMemoryCommitments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        tenant_id: TenantId,
        commitment_id: CommitmentId,
        lines: Vec<CommitmentLine>,
    ) {
        self.commitments
            .lock()
            .expect("commitments lock poisoned")
            .insert((tenant_id, commitment_id), lines);
    }
}

impl CommitmentSource for InMemoryCommitments {
    fn get_commitment(
        &self,
        tenant_id: TenantId,
        commitment_id: CommitmentId,
    ) -> Result<Vec<CommitmentLine>, PortError> {
        self.commitments
            .lock()
            .map_err(|_| PortError::Unavailable("commitments lock poisoned".to_string()))?
            .get(&(tenant_id, commitment_id))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("commitment {commitment_id}")))
    }
}

/// In-memory fleet directory.
#[derive(Debug, Default)]
pub struct InMemoryFleet {
    vehicles: Mutex<HashMap<(TenantId, VehicleId), VehicleProfile>>,
}

impl InMemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenant_id: TenantId, vehicle_id: VehicleId, profile: VehicleProfile) {
        self.vehicles
            .lock()
            .expect("fleet lock poisoned")
            .insert((tenant_id, vehicle_id), profile);
    }
}

impl VehicleDirectory for InMemoryFleet {
    fn get_vehicle_profile(
        &self,
        tenant_id: TenantId,
        vehicle_id: VehicleId,
    ) -> Result<VehicleProfile, PortError> {
        self.vehicles
            .lock()
            .map_err(|_| PortError::Unavailable("fleet lock poisoned".to_string()))?
            .get(&(tenant_id, vehicle_id))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("vehicle {vehicle_id}")))
    }
}

/// In-memory delivery info store.
#[derive(Debug, Default)]
pub struct InMemoryDeliveryInfo {
    orders: Mutex<HashMap<(TenantId, DemandOrderId), OrderDeliveryInfo>>,
}

impl InMemoryDeliveryInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenant_id: TenantId, order_id: DemandOrderId, info: OrderDeliveryInfo) {
        self.orders
            .lock()
            .expect("delivery info lock poisoned")
            .insert((tenant_id, order_id), info);
    }
}

impl DeliveryInfoSource for InMemoryDeliveryInfo {
    fn get_order_delivery_info(
        &self,
        tenant_id: TenantId,
        order_id: DemandOrderId,
    ) -> Result<OrderDeliveryInfo, PortError> {
        self.orders
            .lock()
            .map_err(|_| PortError::Unavailable("delivery info lock poisoned".to_string()))?
            .get(&(tenant_id, order_id))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("order {order_id}")))
    }
}

/// Stock ledger double that records every signal it receives.
///
/// `fail_next_commit` lets tests exercise the all-or-nothing path of pick
/// list creation.
#[derive(Debug, Default)]
pub struct RecordingStockLedger {
    committed: Mutex<Vec<(TenantId, Vec<StockMovement>)>>,
    released: Mutex<Vec<(TenantId, Vec<StockMovement>)>>,
    deducted: Mutex<Vec<(TenantId, Vec<StockMovement>)>>,
    fail_next_commit: AtomicBool,
}

impl RecordingStockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub fn committed(&self) -> Vec<(TenantId, Vec<StockMovement>)> {
        self.committed.lock().expect("ledger lock poisoned").clone()
    }

    pub fn released(&self) -> Vec<(TenantId, Vec<StockMovement>)> {
        self.released.lock().expect("ledger lock poisoned").clone()
    }

    pub fn deducted(&self) -> Vec<(TenantId, Vec<StockMovement>)> {
        self.deducted.lock().expect("ledger lock poisoned").clone()
    }
}

impl StockLedger for RecordingStockLedger {
    fn commit_stock(&self, tenant_id: TenantId, lines: &[StockMovement]) -> Result<(), PortError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(PortError::Rejected("stock commit refused".to_string()));
        }
        self.committed
            .lock()
            .map_err(|_| PortError::Unavailable("ledger lock poisoned".to_string()))?
            .push((tenant_id, lines.to_vec()));
        Ok(())
    }

    fn release_stock(&self, tenant_id: TenantId, lines: &[StockMovement]) -> Result<(), PortError> {
        self.released
            .lock()
            .map_err(|_| PortError::Unavailable("ledger lock poisoned".to_string()))?
            .push((tenant_id, lines.to_vec()));
        Ok(())
    }

    fn deduct_stock(&self, tenant_id: TenantId, lines: &[StockMovement]) -> Result<(), PortError> {
        self.deducted
            .lock()
            .map_err(|_| PortError::Unavailable("ledger lock poisoned".to_string()))?
            .push((tenant_id, lines.to_vec()));
        Ok(())
    }
}
