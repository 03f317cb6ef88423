//! Logical database paths for the classroom document tree.
//!
//! The uploader reads students back from the same paths the pipeline writes,
//! so both sides build them here.

/// `professors/{professor_id}`
pub fn professor(professor_id: &str) -> String {
    format!("professors/{professor_id}")
}

/// `professors/{professor_id}/classes/{class_id}`
pub fn class(professor_id: &str, class_id: &str) -> String {
    format!("{}/classes/{class_id}", professor(professor_id))
}

/// `professors/{professor_id}/classes/{class_id}/students`
pub fn students(professor_id: &str, class_id: &str) -> String {
    format!("{}/students", class(professor_id, class_id))
}

/// `professors/{professor_id}/classes/{class_id}/students/{student_id}`
pub fn student(professor_id: &str, class_id: &str, student_id: &str) -> String {
    format!("{}/{student_id}", students(professor_id, class_id))
}

/// Storage prefix every masterlist upload lives under.
pub const MASTERLIST_PREFIX: &str = "masterlists/";

/// `masterlists/{professor_id}/{class_id}/{file_name}`
pub fn masterlist_object(professor_id: &str, class_id: &str, file_name: &str) -> String {
    format!("{MASTERLIST_PREFIX}{professor_id}/{class_id}/{file_name}")
}
