pub mod ids;
pub mod note;
pub mod tackle;

pub use ids::{NoteId, VideoId};
pub use note::{
    detail_kind, ClipRow, NewNote, Note, NoteDetail, NoteEdit, NoteSummary, NoteTiming, NoteVideo,
    HIGHLIGHT_STAR,
};
pub use tackle::{NoteTackle, Outcome, TackleFilter, TackleRow};
