use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockflow_core::{Aggregate, AggregateRoot, DomainError, ItemCode, TenantId};
use stockflow_events::Event;

use crate::shipment::{OutboundShipmentId, PackingListId, ShipmentLine};

/// Packing list status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackingListStatus {
    Packing,
    Finalized,
}

/// One packed item row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingItem {
    pub item_code: ItemCode,
    pub qty_to_pack: f64,
    pub qty_packed: f64,
    pub uom: String,
    pub package_no: u32,
}

/// One physical package (carton/pallet).
///
/// `volume_cbm` is derived on finalization from the cm dimensions; the SSCC
/// barcode is assigned then if not already present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub package_no: u32,
    pub package_type: String,
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub gross_weight_kg: f64,
    pub volume_cbm: f64,
    pub sscc_barcode: Option<String>,
}

impl Package {
    /// Default carton seeded when a packing list is opened with no packages.
    fn default_carton() -> Self {
        Self {
            package_no: 1,
            package_type: "Carton".to_string(),
            length_cm: 40.0,
            width_cm: 30.0,
            height_cm: 25.0,
            gross_weight_kg: 12.5,
            volume_cbm: 0.0,
            sscc_barcode: None,
        }
    }
}

fn package_volume_cbm(package: &Package) -> f64 {
    (package.length_cm * package.width_cm * package.height_cm) / 1_000_000.0
}

fn generate_sscc() -> String {
    let raw = Uuid::now_v7().as_u128().to_string();
    format!("(00){}", &raw[..raw.len().min(18)])
}

/// Aggregate root: PackingList.
#[derive(Debug, Clone, PartialEq)]
pub struct PackingList {
    id: PackingListId,
    tenant_id: Option<TenantId>,
    shipment_id: Option<OutboundShipmentId>,
    warehouse: String,
    packing_station: String,
    status: PackingListStatus,
    items: Vec<PackingItem>,
    packages: Vec<Package>,
    total_weight_kg: f64,
    total_volume_cbm: f64,
    version: u64,
    created: bool,
}

impl PackingList {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PackingListId) -> Self {
        Self {
            id,
            tenant_id: None,
            shipment_id: None,
            warehouse: String::new(),
            packing_station: String::new(),
            status: PackingListStatus::Packing,
            items: Vec::new(),
            packages: Vec::new(),
            total_weight_kg: 0.0,
            total_volume_cbm: 0.0,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PackingListId {
        self.id
    }

    pub fn shipment_id(&self) -> Option<OutboundShipmentId> {
        self.shipment_id
    }

    pub fn status(&self) -> PackingListStatus {
        self.status
    }

    pub fn items(&self) -> &[PackingItem] {
        &self.items
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn total_weight_kg(&self) -> f64 {
        self.total_weight_kg
    }

    pub fn total_volume_cbm(&self) -> f64 {
        self.total_volume_cbm
    }
}

impl AggregateRoot for PackingList {
    type Id = PackingListId;

    const KIND: &'static str = "shipping.packing_list";

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenPackingList. Seeded from the shipment's packable rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPackingList {
    pub tenant_id: TenantId,
    pub packing_list_id: PackingListId,
    pub shipment_id: OutboundShipmentId,
    pub warehouse: String,
    pub packing_station: String,
    pub rows: Vec<ShipmentLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddPackage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddPackage {
    pub tenant_id: TenantId,
    pub packing_list_id: PackingListId,
    pub package_type: String,
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub gross_weight_kg: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FinalizePacking. Computes package volumes and totals, assigns
/// SSCC barcodes, and freezes the packing list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizePacking {
    pub tenant_id: TenantId,
    pub packing_list_id: PackingListId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PackingListCommand {
    OpenPackingList(OpenPackingList),
    AddPackage(AddPackage),
    FinalizePacking(FinalizePacking),
}

/// Event: PackingListOpened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingListOpened {
    pub tenant_id: TenantId,
    pub packing_list_id: PackingListId,
    pub shipment_id: OutboundShipmentId,
    pub warehouse: String,
    pub packing_station: String,
    pub items: Vec<PackingItem>,
    pub packages: Vec<Package>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PackageAdded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageAdded {
    pub tenant_id: TenantId,
    pub packing_list_id: PackingListId,
    pub package: Package,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PackingFinalized.
///
/// Carries the fully derived packages (volumes, barcodes) and totals so the
/// shipment write-back needs nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingFinalized {
    pub tenant_id: TenantId,
    pub packing_list_id: PackingListId,
    pub shipment_id: OutboundShipmentId,
    pub packages: Vec<Package>,
    pub total_weight_kg: f64,
    pub total_volume_cbm: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PackingListEvent {
    PackingListOpened(PackingListOpened),
    PackageAdded(PackageAdded),
    PackingFinalized(PackingFinalized),
}

impl Event for PackingListEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PackingListEvent::PackingListOpened(_) => "shipping.packing_list.opened",
            PackingListEvent::PackageAdded(_) => "shipping.packing_list.package_added",
            PackingListEvent::PackingFinalized(_) => "shipping.packing_list.finalized",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PackingListEvent::PackingListOpened(e) => e.occurred_at,
            PackingListEvent::PackageAdded(e) => e.occurred_at,
            PackingListEvent::PackingFinalized(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PackingList {
    type Command = PackingListCommand;
    type Event = PackingListEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PackingListEvent::PackingListOpened(e) => {
                self.id = e.packing_list_id;
                self.tenant_id = Some(e.tenant_id);
                self.shipment_id = Some(e.shipment_id);
                self.warehouse = e.warehouse.clone();
                self.packing_station = e.packing_station.clone();
                self.status = PackingListStatus::Packing;
                self.items = e.items.clone();
                self.packages = e.packages.clone();
                self.created = true;
            }
            PackingListEvent::PackageAdded(e) => {
                self.packages.push(e.package.clone());
            }
            PackingListEvent::PackingFinalized(e) => {
                self.packages = e.packages.clone();
                self.total_weight_kg = e.total_weight_kg;
                self.total_volume_cbm = e.total_volume_cbm;
                self.status = PackingListStatus::Finalized;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PackingListCommand::OpenPackingList(cmd) => self.handle_open(cmd),
            PackingListCommand::AddPackage(cmd) => self.handle_add_package(cmd),
            PackingListCommand::FinalizePacking(cmd) => self.handle_finalize(cmd),
        }
    }
}

impl PackingList {
    fn ensure_exists(
        &self,
        tenant_id: TenantId,
        packing_list_id: PackingListId,
    ) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::precondition("tenant mismatch"));
        }
        if self.id != packing_list_id {
            return Err(DomainError::precondition("packing_list_id mismatch"));
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.status != PackingListStatus::Packing {
            return Err(DomainError::precondition("packing list already finalized"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenPackingList) -> Result<Vec<PackingListEvent>, DomainError> {
        if self.created {
            return Err(DomainError::already_exists("packing list already exists"));
        }
        if cmd.rows.is_empty() {
            return Err(DomainError::validation("packing list items are required"));
        }

        let items = cmd
            .rows
            .iter()
            .map(|row| PackingItem {
                item_code: row.item_code.clone(),
                qty_to_pack: row.qty_picked,
                qty_packed: row.qty_picked,
                uom: row.uom.clone(),
                package_no: 1,
            })
            .collect();

        Ok(vec![PackingListEvent::PackingListOpened(PackingListOpened {
            tenant_id: cmd.tenant_id,
            packing_list_id: cmd.packing_list_id,
            shipment_id: cmd.shipment_id,
            warehouse: cmd.warehouse.clone(),
            packing_station: cmd.packing_station.clone(),
            items,
            packages: vec![Package::default_carton()],
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_package(&self, cmd: &AddPackage) -> Result<Vec<PackingListEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.packing_list_id)?;
        self.ensure_open()?;

        if cmd.package_type.trim().is_empty() {
            return Err(DomainError::validation("package type is required"));
        }

        let next_no = self.packages.iter().map(|p| p.package_no).max().unwrap_or(0) + 1;
        Ok(vec![PackingListEvent::PackageAdded(PackageAdded {
            tenant_id: cmd.tenant_id,
            packing_list_id: cmd.packing_list_id,
            package: Package {
                package_no: next_no,
                package_type: cmd.package_type.clone(),
                length_cm: cmd.length_cm,
                width_cm: cmd.width_cm,
                height_cm: cmd.height_cm,
                gross_weight_kg: cmd.gross_weight_kg,
                volume_cbm: 0.0,
                sscc_barcode: None,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_finalize(&self, cmd: &FinalizePacking) -> Result<Vec<PackingListEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.packing_list_id)?;
        self.ensure_open()?;

        let shipment_id = self
            .shipment_id
            .ok_or_else(|| DomainError::precondition("outbound shipment is required"))?;

        let mut total_weight = 0.0;
        let mut total_volume = 0.0;
        let mut packages = self.packages.clone();

        for package in &mut packages {
            package.volume_cbm = package_volume_cbm(package);
            total_volume += package.volume_cbm;
            total_weight += package.gross_weight_kg;

            if package.sscc_barcode.is_none() {
                package.sscc_barcode = Some(generate_sscc());
            }
        }

        Ok(vec![PackingListEvent::PackingFinalized(PackingFinalized {
            tenant_id: cmd.tenant_id,
            packing_list_id: cmd.packing_list_id,
            shipment_id,
            packages,
            total_weight_kg: total_weight,
            total_volume_cbm: total_volume,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_core::AggregateId;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_packing_list_id() -> PackingListId {
        PackingListId::new(AggregateId::new())
    }

    fn test_shipment_id() -> OutboundShipmentId {
        OutboundShipmentId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn row(code: &str, picked: f64) -> ShipmentLine {
        ShipmentLine {
            item_code: ItemCode::new(code).unwrap(),
            qty_picked: picked,
            warehouse: "WH-Main".to_string(),
            uom: "Nos".to_string(),
            batch_no: None,
        }
    }

    fn run(list: &mut PackingList, cmd: PackingListCommand) {
        let events = list.handle(&cmd).unwrap();
        for event in &events {
            list.apply(event);
        }
    }

    fn open_list(tenant_id: TenantId, id: PackingListId) -> PackingList {
        let mut list = PackingList::empty(id);
        run(
            &mut list,
            PackingListCommand::OpenPackingList(OpenPackingList {
                tenant_id,
                packing_list_id: id,
                shipment_id: test_shipment_id(),
                warehouse: "WH-Main".to_string(),
                packing_station: "PS-01".to_string(),
                rows: vec![row("SKU-A", 6.0)],
                occurred_at: test_time(),
            }),
        );
        list
    }

    #[test]
    fn open_seeds_items_and_a_default_carton() {
        let list = open_list(test_tenant_id(), test_packing_list_id());
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.items()[0].qty_to_pack, 6.0);
        assert_eq!(list.items()[0].qty_packed, 6.0);
        assert_eq!(list.items()[0].package_no, 1);
        assert_eq!(list.packages().len(), 1);
        assert_eq!(list.packages()[0].package_type, "Carton");
    }

    #[test]
    fn open_without_rows_is_rejected() {
        let tenant_id = test_tenant_id();
        let id = test_packing_list_id();
        let list = PackingList::empty(id);

        let err = list
            .handle(&PackingListCommand::OpenPackingList(OpenPackingList {
                tenant_id,
                packing_list_id: id,
                shipment_id: test_shipment_id(),
                warehouse: "WH-Main".to_string(),
                packing_station: "PS-01".to_string(),
                rows: vec![],
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn added_packages_get_sequential_numbers() {
        let tenant_id = test_tenant_id();
        let id = test_packing_list_id();
        let mut list = open_list(tenant_id, id);

        run(
            &mut list,
            PackingListCommand::AddPackage(AddPackage {
                tenant_id,
                packing_list_id: id,
                package_type: "Pallet".to_string(),
                length_cm: 120.0,
                width_cm: 80.0,
                height_cm: 100.0,
                gross_weight_kg: 250.0,
                occurred_at: test_time(),
            }),
        );

        assert_eq!(list.packages().len(), 2);
        assert_eq!(list.packages()[1].package_no, 2);
    }

    #[test]
    fn finalize_computes_volumes_totals_and_barcodes() {
        let tenant_id = test_tenant_id();
        let id = test_packing_list_id();
        let mut list = open_list(tenant_id, id);
        run(
            &mut list,
            PackingListCommand::AddPackage(AddPackage {
                tenant_id,
                packing_list_id: id,
                package_type: "Pallet".to_string(),
                length_cm: 120.0,
                width_cm: 80.0,
                height_cm: 100.0,
                gross_weight_kg: 250.0,
                occurred_at: test_time(),
            }),
        );

        run(
            &mut list,
            PackingListCommand::FinalizePacking(FinalizePacking {
                tenant_id,
                packing_list_id: id,
                occurred_at: test_time(),
            }),
        );

        assert_eq!(list.status(), PackingListStatus::Finalized);
        // Carton: 40*30*25 cm³ = 0.03 m³; pallet: 120*80*100 cm³ = 0.96 m³.
        assert!((list.packages()[0].volume_cbm - 0.03).abs() < 1e-9);
        assert!((list.packages()[1].volume_cbm - 0.96).abs() < 1e-9);
        assert!((list.total_volume_cbm() - 0.99).abs() < 1e-9);
        assert!((list.total_weight_kg() - 262.5).abs() < 1e-9);

        for package in list.packages() {
            let sscc = package.sscc_barcode.as_ref().unwrap();
            assert!(sscc.starts_with("(00)"));
        }
    }

    #[test]
    fn finalize_twice_is_rejected() {
        let tenant_id = test_tenant_id();
        let id = test_packing_list_id();
        let mut list = open_list(tenant_id, id);
        run(
            &mut list,
            PackingListCommand::FinalizePacking(FinalizePacking {
                tenant_id,
                packing_list_id: id,
                occurred_at: test_time(),
            }),
        );

        let err = list
            .handle(&PackingListCommand::FinalizePacking(FinalizePacking {
                tenant_id,
                packing_list_id: id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Precondition(_)));
    }
}
