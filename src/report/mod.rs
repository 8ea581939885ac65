pub mod assembler;
pub mod document;
pub mod snapshot;

pub use assembler::{AssemblyPhase, ReportAssembler, ReportError, SnapshotMap};
pub use document::{DocumentBuilder, PdfReportBuilder, ReportCard, ReportDocument, ReportInput};
pub use snapshot::{ResvgCapturer, Snapshot, SnapshotCapturer, SnapshotError};
