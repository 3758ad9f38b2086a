// Curriculum record and experience rows. Saving an experience commits its
// evidentiary attachments right after the row itself is stored.

pub mod handlers;
