//! The canonical keyed set of resting orders plus aggregation indexes.

use std::collections::{BTreeMap, HashMap};

use ordered_float::OrderedFloat;

use super::{Order, SIZE_EPSILON, Side};

/// Aggregate state for one `(price, side)` bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bucket {
    /// Sum of member sizes.
    pub total_size: f64,
    /// Member order ids in arrival order.
    pub members: Vec<u64>,
}

/// The live order set with per-side price-bucket indexes.
///
/// Every mutation keeps the invariant that each live order has exactly one
/// membership entry in its `(price, side)` bucket and that the bucket's
/// `total_size` equals the sum of member sizes. Buckets whose aggregate
/// decays to the empty tolerance are deleted, never retained at zero, so
/// phantom price levels cannot appear in the depth view.
///
/// Mutations mark the store dirty; the engine drains the mark with
/// [`take_dirty`](OrderStore::take_dirty) and forwards it to the rebuild
/// scheduler.
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: HashMap<u64, Order>,
    bids: BTreeMap<OrderedFloat<f64>, Bucket>,
    asks: BTreeMap<OrderedFloat<f64>, Bucket>,
    dirty: bool,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live orders.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of occupied price levels on one side.
    pub fn level_count(&self, side: Side) -> usize {
        self.side(side).len()
    }

    /// Looks up a live order by id.
    pub fn get(&self, id: u64) -> Option<&Order> {
        self.orders.get(&id)
    }

    /// A bucket's aggregate size, if the level is occupied.
    pub fn bucket_total(&self, side: Side, price: f64) -> Option<f64> {
        self.side(side).get(&OrderedFloat(price)).map(|b| b.total_size)
    }

    /// All occupied prices across both sides.
    pub fn occupied_prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.bids
            .keys()
            .chain(self.asks.keys())
            .map(|k| k.into_inner())
    }

    /// One side's buckets in ascending price order.
    pub(crate) fn side(&self, side: Side) -> &BTreeMap<OrderedFloat<f64>, Bucket> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<OrderedFloat<f64>, Bucket> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Replaces the entire live set from a snapshot.
    pub fn reset<I: IntoIterator<Item = Order>>(&mut self, orders: I) {
        self.orders.clear();
        self.bids.clear();
        self.asks.clear();
        for order in orders {
            self.insert(order);
        }
        self.dirty = true;
    }

    /// Inserts an order, replacing any prior order with the same id.
    ///
    /// The prior order leaves all indexes before the new one is inserted,
    /// which defends against re-delivery of `open` events after a reconnect.
    pub fn upsert(&mut self, order: Order) {
        self.evict(order.id);
        self.insert(order);
        self.dirty = true;
    }

    /// Removes an order by id, returning whether it was present.
    ///
    /// Unknown ids are a silent no-op: the feed is not assumed gap-free, so
    /// a diff may reference an order the store never saw.
    pub fn remove(&mut self, id: u64) -> bool {
        let removed = self.evict(id);
        if removed {
            self.dirty = true;
        }
        removed
    }

    /// Drops all orders and buckets without marking dirty (session teardown).
    pub fn clear(&mut self) {
        self.orders.clear();
        self.bids.clear();
        self.asks.clear();
        self.dirty = false;
    }

    /// Clears the dirty mark, returning whether it was set.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn insert(&mut self, order: Order) {
        let bucket = self
            .side_mut(order.side)
            .entry(OrderedFloat(order.price))
            .or_default();
        bucket.total_size += order.size;
        bucket.members.push(order.id);
        self.orders.insert(order.id, order);
    }

    fn evict(&mut self, id: u64) -> bool {
        let Some(order) = self.orders.remove(&id) else {
            return false;
        };
        let key = OrderedFloat(order.price);
        let levels = self.side_mut(order.side);
        if let Some(bucket) = levels.get_mut(&key) {
            bucket.members.retain(|&member| member != id);
            bucket.total_size -= order.size;
            if bucket.members.is_empty() || bucket.total_size <= SIZE_EPSILON {
                levels.remove(&key);
            }
        }
        true
    }
}
