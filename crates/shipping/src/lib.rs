//! Shipping domain module (outbound shipments and packing lists, event-sourced).
//!
//! An outbound shipment consolidates the picked stock of a pick list. Once
//! submitted it sits in the Packing stage, from which exactly one packing
//! list can ever be cut; finalizing the packing list writes weight/volume
//! totals back and moves the shipment to Packed.

pub mod packing_list;
pub mod shipment;

pub use packing_list::{
    AddPackage, FinalizePacking, OpenPackingList, Package, PackingFinalized, PackingItem,
    PackingList, PackingListCommand, PackingListEvent, PackingListOpened, PackingListStatus,
    PackageAdded,
};
pub use shipment::{
    CreatePackingList, DocStatus, OpenShipment, OutboundShipment, OutboundShipmentCommand,
    OutboundShipmentEvent, OutboundShipmentId, PackingListCreated, PackingListId,
    PackingTotalsRecorded, RecordPackingTotals, ShipmentLine, ShipmentOpened, ShipmentStatus,
    ShipmentSubmitted, SubmitShipment,
};
