use dashmap::DashMap;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{Instructor, Venue};

/// In-memory venue/instructor registry. The booking engine only reads from
/// it (venue capacity bounds class sizes); registration happens through the
/// API before class definitions reference the entries.
#[derive(Default)]
pub struct Directory {
    venues: DashMap<Uuid, Venue>,
    instructors: DashMap<Uuid, Instructor>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_venue(&self, name: String, capacity: u32, address: Option<String>) -> Venue {
        let venue = Venue {
            id: Uuid::new_v4(),
            name,
            capacity,
            address,
        };
        self.venues.insert(venue.id, venue.clone());
        venue
    }

    pub fn register_instructor(&self, name: String) -> Instructor {
        let instructor = Instructor {
            id: Uuid::new_v4(),
            name,
        };
        self.instructors.insert(instructor.id, instructor.clone());
        instructor
    }

    pub fn venue(&self, id: Uuid) -> Result<Venue, EngineError> {
        self.venues
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(EngineError::NotFound { kind: "venue", id })
    }

    pub fn instructor(&self, id: Uuid) -> Result<Instructor, EngineError> {
        self.instructors
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(EngineError::NotFound { kind: "instructor", id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let directory = Directory::new();
        let venue = directory.register_venue("Main hall".into(), 20, None);
        let instructor = directory.register_instructor("Kim".into());

        assert_eq!(directory.venue(venue.id).unwrap().capacity, 20);
        assert_eq!(directory.instructor(instructor.id).unwrap().name, "Kim");
    }

    #[test]
    fn test_unknown_ids_not_found() {
        let directory = Directory::new();
        assert!(matches!(
            directory.venue(Uuid::new_v4()),
            Err(EngineError::NotFound { kind: "venue", .. })
        ));
        assert!(matches!(
            directory.instructor(Uuid::new_v4()),
            Err(EngineError::NotFound { kind: "instructor", .. })
        ));
    }
}
