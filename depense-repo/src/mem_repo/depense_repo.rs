use crate::depense_repo::DepenseRepoError::DepenseNotFound;
use crate::depense_repo::{
    now_micros, Depense, DepenseChanges, DepenseRepo, DepenseRepoError, NewDepense,
    UpdatedDepense,
};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct State {
    depenses: HashMap<i32, Depense>,
    next_id: i32,
}

pub struct MemDepenseRepo {
    state: RwLock<State>,
}

impl MemDepenseRepo {
    pub fn new() -> MemDepenseRepo {
        let state = State {
            depenses: HashMap::new(),
            next_id: 1,
        };
        MemDepenseRepo {
            state: RwLock::new(state),
        }
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<State>, anyhow::Error> {
        self.state
            .read()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<State>, anyhow::Error> {
        self.state
            .write()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }
}

#[async_trait]
impl DepenseRepo for MemDepenseRepo {
    async fn get_depense(&self, depense_id: i32) -> Result<Depense, DepenseRepoError> {
        let read_guard = self.read_lock()?;

        read_guard
            .depenses
            .get(&depense_id)
            .cloned()
            .ok_or(DepenseNotFound(depense_id))
    }

    async fn get_all_depenses(&self) -> Result<Vec<Depense>, DepenseRepoError> {
        let read_guard = self.read_lock()?;

        let mut depenses: Vec<Depense> = read_guard.depenses.values().cloned().collect();
        depenses.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(depenses)
    }

    async fn create_depense(&self, new_depense: NewDepense) -> Result<Depense, DepenseRepoError> {
        let mut write_guard = self.write_lock()?;

        let id = write_guard.next_id;
        write_guard.next_id += 1;

        let depense = new_depense.into_depense(id, now_micros());
        write_guard.depenses.insert(id, depense.clone());

        Ok(depense)
    }

    async fn update_depense(
        &self,
        depense_id: i32,
        changes: DepenseChanges,
    ) -> Result<UpdatedDepense, DepenseRepoError> {
        let mut write_guard = self.write_lock()?;

        let Some(depense) = write_guard.depenses.get_mut(&depense_id) else {
            return Err(DepenseNotFound(depense_id));
        };
        let released_attachment = changes.apply(depense);

        Ok(UpdatedDepense {
            depense: depense.clone(),
            released_attachment,
        })
    }

    async fn delete_depense(&self, depense_id: i32) -> Result<Depense, DepenseRepoError> {
        let mut write_guard = self.write_lock()?;

        write_guard
            .depenses
            .remove(&depense_id)
            .ok_or(DepenseNotFound(depense_id))
    }
}
