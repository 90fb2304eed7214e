//! Receiving domain module (advance shipment notices, event-sourced).
//!
//! Reconciles inbound shipment notices against purchase commitments: only the
//! outstanding quantity of each commitment line is materialized on the notice.

pub mod notice;

pub use notice::{
    ChangeSupplier, CommitmentId, CommitmentLine, CommitmentSelected, CreateNotice, DocStatus,
    NoticeCreated, NoticeId, NoticeLine, NoticeSubmitted, SelectCommitment, ShipmentNotice,
    ShipmentNoticeCommand, ShipmentNoticeEvent, SubmitNotice, SupplierChanged, SupplierId,
    reconcile,
};
