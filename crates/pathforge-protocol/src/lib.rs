pub mod job;
pub mod protocol;
pub mod track;

pub use job::WorkerJob;
pub use protocol::{read_message, write_message, ControlMessage, WorkerReport, WorkerSolution};
pub use track::{BeatRecord, NoteRecord, TrackView};
