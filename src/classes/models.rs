use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Class {
    pub id: i32,
    pub name: String,
    pub capacity: i32,
    pub teacher_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct NewClassIn {
    pub name: String,
    pub capacity: i32,
    pub teacher_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CapacityQuery {
    #[serde(rename = "classId")]
    pub class_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct CapacityIn {
    pub capacity: i32,
}

#[derive(Debug, Deserialize)]
pub struct EnrollIn {
    pub student_id: i32,
}

/// Capacity may never shrink below the current head count. The caller reads
/// the count and then writes; there is no compare-and-swap between the two,
/// so concurrent updates are last-writer-wins.
pub fn capacity_update_allowed(requested: i32, enrolled: i64) -> Result<(), String> {
    if requested < 0 {
        return Err("capacity must be non-negative".to_string());
    }
    if i64::from(requested) < enrolled {
        return Err(format!(
            "capacity {} is below current enrollment {}",
            requested, enrolled
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_cannot_shrink_below_enrollment() {
        assert!(capacity_update_allowed(30, 25).is_ok());
        assert!(capacity_update_allowed(25, 25).is_ok());
        assert!(capacity_update_allowed(24, 25).is_err());
        assert!(capacity_update_allowed(-1, 0).is_err());
        assert!(capacity_update_allowed(0, 0).is_ok());
    }

    #[test]
    fn concurrent_capacity_writes_are_last_writer_wins() {
        // both writers validate against the same snapshot; the check alone
        // cannot order them
        let snapshot = 10i64;
        assert!(capacity_update_allowed(12, snapshot).is_ok());
        assert!(capacity_update_allowed(15, snapshot).is_ok());
    }
}
