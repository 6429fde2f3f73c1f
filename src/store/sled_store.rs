use super::{LedgerStore, MovementQuery, TankQuery};
use crate::error::{LedgerError, LedgerResult};
use crate::movement::Movement;
use crate::tank::Tank;
use sled::{Db, Tree};
use std::sync::Arc;
use tracing::trace;

const TANKS_TREE: &str = "tanks";
const MOVEMENTS_TREE: &str = "movements";

/// [`LedgerStore`] over an embedded sled database, one tree per document type.
#[derive(Clone)]
pub struct SledLedgerStore {
    instance: Arc<Db>,
    tanks: Tree,
    movements: Tree,
}

impl SledLedgerStore {
    pub fn new(instance: Arc<Db>) -> LedgerResult<Self> {
        let tanks = instance.open_tree(TANKS_TREE)?;
        let movements = instance.open_tree(MOVEMENTS_TREE)?;
        Ok(Self {
            instance,
            tanks,
            movements,
        })
    }

    /// A database that is removed when dropped.
    pub fn temporary() -> LedgerResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::new(Arc::new(db))
    }
}

fn encode<T: minicbor::Encode<()>>(document: &T) -> LedgerResult<Vec<u8>> {
    minicbor::to_vec(document).map_err(|e| LedgerError::Encoding(e.to_string()))
}

fn decode<T>(bytes: &[u8]) -> LedgerResult<T>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    Ok(minicbor::decode(bytes)?)
}

fn get<T>(tree: &Tree, id: &str) -> LedgerResult<Option<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    tree.get(id.as_bytes())?
        .map(|bytes| decode(&bytes))
        .transpose()
}

fn insert<T: minicbor::Encode<()>>(tree: &Tree, id: &str, document: &T) -> LedgerResult<()> {
    let encoded = encode(document)?;
    tree.compare_and_swap(id.as_bytes(), None as Option<&[u8]>, Some(encoded))?
        .map_err(|_| LedgerError::Internal(format!("document {id} already exists")))
}

// read-modify-write, retried until no concurrent writer got in between
fn update<T>(tree: &Tree, id: &str, apply: &mut dyn FnMut(&mut T)) -> LedgerResult<Option<T>>
where
    T: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()>,
{
    loop {
        let Some(current) = tree.get(id.as_bytes())? else {
            return Ok(None);
        };
        let mut document: T = decode(&current)?;
        apply(&mut document);
        let encoded = encode(&document)?;

        match tree.compare_and_swap(id.as_bytes(), Some(current), Some(encoded))? {
            Ok(()) => return Ok(Some(document)),
            Err(_) => trace!(id, "document changed underneath update, retrying"),
        }
    }
}

fn remove<T>(tree: &Tree, id: &str) -> LedgerResult<Option<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    tree.remove(id.as_bytes())?
        .map(|bytes| decode(&bytes))
        .transpose()
}

fn scan<T>(tree: &Tree, mut keep: impl FnMut(&T) -> bool) -> LedgerResult<Vec<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    let mut documents = Vec::new();
    for entry in tree.iter() {
        let (_, bytes) = entry?;
        let document: T = decode(&bytes)?;
        if keep(&document) {
            documents.push(document);
        }
    }
    Ok(documents)
}

impl LedgerStore for SledLedgerStore {
    fn get_tank(&self, id: &str) -> LedgerResult<Option<Tank>> {
        get(&self.tanks, id)
    }

    fn insert_tank(&self, tank: &Tank) -> LedgerResult<()> {
        insert(&self.tanks, &tank.id, tank)
    }

    fn update_tank(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut Tank),
    ) -> LedgerResult<Option<Tank>> {
        update(&self.tanks, id, &mut |tank: &mut Tank| {
            apply(tank);
            tank.version += 1;
        })
    }

    fn delete_tank(&self, id: &str) -> LedgerResult<Option<Tank>> {
        remove(&self.tanks, id)
    }

    fn query_tanks(&self, query: &TankQuery) -> LedgerResult<Vec<Tank>> {
        let tanks = scan(&self.tanks, |tank: &Tank| query.matches(tank))?;
        Ok(query.apply(tanks))
    }

    fn get_movement(&self, id: &str) -> LedgerResult<Option<Movement>> {
        get(&self.movements, id)
    }

    fn insert_movement(&self, movement: &Movement) -> LedgerResult<()> {
        insert(&self.movements, &movement.id, movement)
    }

    fn update_movement(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut Movement),
    ) -> LedgerResult<Option<Movement>> {
        update(&self.movements, id, apply)
    }

    fn delete_movement(&self, id: &str) -> LedgerResult<Option<Movement>> {
        remove(&self.movements, id)
    }

    fn query_movements(&self, query: &MovementQuery) -> LedgerResult<Vec<Movement>> {
        let movements = scan(&self.movements, |movement: &Movement| query.matches(movement))?;
        Ok(query.apply(movements))
    }

    fn next_sequence(&self) -> LedgerResult<u64> {
        Ok(self.instance.generate_id()?)
    }
}
