//! Picking domain module (pick lists, event-sourced).
//!
//! A pick list walks a fixed lifecycle under worker control:
//! `Draft → Released → Assigned → Picking → Completed`, with cancellation
//! possible from any non-terminal state. Barcode checkpoints are verified
//! while picking and recorded as facts; they never advance the lifecycle.

pub mod pick_list;

pub use pick_list::{
    Assign, Cancel, CheckpointKind, CheckpointRecord, CheckpointVerified, CompletePicking,
    LineMarkedShort, LinePicked, MarkShort, OpenPickList, PickCancelled, PickList,
    PickListCommand, PickListEvent, PickListLine, PickListOpened, PickListReleased,
    PickListStatus, PickerAssigned, PickingCompleted, PickingStarted, RecordPick, Release, Scan,
    StartPicking, StockMovement,
};
