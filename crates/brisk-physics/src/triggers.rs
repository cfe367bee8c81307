//! Trigger bookkeeping
//!
//! [`ColliderTriggerHelper`] remembers which trigger pairs overlapped on the
//! previous update, so listeners hear exactly one enter when a pair starts
//! overlapping and one exit when it stops.

use std::hash::{Hash, Hasher};

use ahash::RandomState;
use brisk_core::Entity;
use indexmap::IndexSet;

use crate::collider::ColliderId;
use crate::error::PhysicsResult;
use crate::world::PhysicsWorld;

/// Receives trigger notifications for an entity
pub trait TriggerListener {
    /// `other` started overlapping `local`, one of this entity's colliders
    fn on_trigger_enter(&mut self, other: ColliderId, local: ColliderId);

    /// `other` stopped overlapping `local`
    fn on_trigger_exit(&mut self, other: ColliderId, local: ColliderId);
}

/// Two colliders that overlap while at least one of them is a trigger.
/// Equality ignores order; `local` is the side whose helper found the pair.
#[derive(Debug, Clone, Copy)]
pub struct TriggerPair {
    pub local: ColliderId,
    pub other: ColliderId,
}

impl TriggerPair {
    pub fn new(local: ColliderId, other: ColliderId) -> Self {
        Self { local, other }
    }

    fn ordered(&self) -> (ColliderId, ColliderId) {
        if self.local <= self.other {
            (self.local, self.other)
        } else {
            (self.other, self.local)
        }
    }
}

impl PartialEq for TriggerPair {
    fn eq(&self, other: &Self) -> bool {
        self.ordered() == other.ordered()
    }
}

impl Eq for TriggerPair {}

impl Hash for TriggerPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordered().hash(state);
    }
}

/// Default sort order at and above which enter notifications are deferred
pub const DEFAULT_LATE_SORT_ORDER: i32 = i32::MAX;

#[derive(Debug, Clone)]
pub struct ColliderTriggerHelper {
    entity: Entity,
    active_triggers: IndexSet<TriggerPair, RandomState>,
    previous_triggers: IndexSet<TriggerPair, RandomState>,
    /// Neighbors with a cast sort order at or above this get their enter
    /// notification after everyone else's
    late_sort_order: i32,
    late_pairs: Vec<TriggerPair>,
}

impl ColliderTriggerHelper {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            active_triggers: IndexSet::default(),
            previous_triggers: IndexSet::default(),
            late_sort_order: DEFAULT_LATE_SORT_ORDER,
            late_pairs: Vec::new(),
        }
    }

    pub fn with_late_sort_order(mut self, order: i32) -> Self {
        self.late_sort_order = order;
        self
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Pairs that overlapped during the last update
    pub fn current_triggers(&self) -> impl Iterator<Item = &TriggerPair> {
        self.previous_triggers.iter()
    }

    /// Find the trigger overlaps of this entity's collider and fire enter and
    /// exit notifications for whatever changed since the last update
    pub fn update(&mut self, world: &mut PhysicsWorld) -> PhysicsResult<()> {
        if let Some(local) = world.collider_of(self.entity) {
            self.collect_overlaps(world, local)?;
        }
        self.check_for_exited_colliders(world);
        Ok(())
    }

    fn collect_overlaps(&mut self, world: &mut PhysicsWorld, local: ColliderId) -> PhysicsResult<()> {
        let (enabled, local_is_trigger, mask) = match world.collider(local) {
            Some(collider) => (collider.enabled(), collider.is_trigger(), collider.collides_with_layers()),
            None => return Ok(()),
        };
        if !enabled {
            return Ok(());
        }

        let bounds = world.collider_bounds(local)?;
        let neighbors = world.take_broadphase(&bounds, Some(local), mask);

        for &neighbor in &neighbors {
            let Some((neighbor_is_trigger, neighbor_order)) = world
                .collider(neighbor)
                .map(|collider| (collider.is_trigger(), collider.cast_sort_order()))
            else {
                continue;
            };

            // Solid on solid is the mover's business, not ours
            if !local_is_trigger && !neighbor_is_trigger {
                continue;
            }

            if !world.overlaps(local, neighbor)? {
                continue;
            }

            let pair = TriggerPair::new(local, neighbor);
            let is_new = !self.active_triggers.contains(&pair) && !self.previous_triggers.contains(&pair);
            if is_new {
                if neighbor_order >= self.late_sort_order {
                    self.late_pairs.push(pair);
                } else {
                    world.notify_trigger_listeners(pair, true);
                }
            }
            self.active_triggers.insert(pair);
        }
        world.recycle_broadphase(neighbors);

        for pair in self.late_pairs.drain(..) {
            world.notify_trigger_listeners(pair, true);
        }
        Ok(())
    }

    fn check_for_exited_colliders(&mut self, world: &mut PhysicsWorld) {
        for pair in &self.previous_triggers {
            if !self.active_triggers.contains(pair) {
                world.notify_trigger_listeners(*pair, false);
            }
        }

        std::mem::swap(&mut self.previous_triggers, &mut self.active_triggers);
        self.active_triggers.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use brisk_core::{Transform2D, Vec2};

    use super::*;
    use crate::collider::ColliderShape;
    use crate::config::ColliderConfig;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Enter(ColliderId, ColliderId),
        Exit(ColliderId, ColliderId),
    }

    struct Recorder(Rc<RefCell<Vec<Event>>>);

    impl TriggerListener for Recorder {
        fn on_trigger_enter(&mut self, other: ColliderId, local: ColliderId) {
            self.0.borrow_mut().push(Event::Enter(other, local));
        }

        fn on_trigger_exit(&mut self, other: ColliderId, local: ColliderId) {
            self.0.borrow_mut().push(Event::Exit(other, local));
        }
    }

    fn spawn(world: &mut PhysicsWorld, position: Vec2, config: ColliderConfig) -> (Entity, ColliderId) {
        let entity = world.create_entity(Transform2D::from_position(position));
        let collider = world
            .add_collider(entity, ColliderShape::Box { width: 10.0, height: 10.0 }, config)
            .unwrap();
        (entity, collider)
    }

    #[test]
    fn test_pair_equality_ignores_order() {
        let a = ColliderId::new(0, 0);
        let b = ColliderId::new(1, 0);
        assert_eq!(TriggerPair::new(a, b), TriggerPair::new(b, a));

        let mut set: IndexSet<TriggerPair, RandomState> = IndexSet::default();
        set.insert(TriggerPair::new(a, b));
        assert!(set.contains(&TriggerPair::new(b, a)));
    }

    #[test]
    fn test_enter_and_exit_fire_once() {
        let mut world = PhysicsWorld::default();
        let (mover, mover_collider) = spawn(&mut world, Vec2::ZERO, ColliderConfig::default());
        let (zone, zone_collider) = spawn(&mut world, Vec2::new(100.0, 0.0), ColliderConfig::trigger());

        let events = Rc::new(RefCell::new(Vec::new()));
        world.add_trigger_listener(mover, Recorder(events.clone())).unwrap();
        world.add_trigger_listener(zone, Recorder(events.clone())).unwrap();

        let mut helper = ColliderTriggerHelper::new(mover);
        let path = [0.0, 50.0, 95.0, 100.0, 105.0, 150.0, 200.0];
        for x in path {
            world.set_position(mover, Vec2::new(x, 0.0)).unwrap();
            helper.update(&mut world).unwrap();
        }

        let events = events.borrow();
        let enters = events.iter().filter(|e| matches!(e, Event::Enter(..))).count();
        let exits = events.iter().filter(|e| matches!(e, Event::Exit(..))).count();
        // Both sides hear about it
        assert_eq!(enters, 2);
        assert_eq!(exits, 2);
        assert_eq!(events[0], Event::Enter(zone_collider, mover_collider));
        assert_eq!(events[1], Event::Enter(mover_collider, zone_collider));
    }

    #[test]
    fn test_two_solids_are_not_triggers() {
        let mut world = PhysicsWorld::default();
        let (mover, _) = spawn(&mut world, Vec2::ZERO, ColliderConfig::default());
        spawn(&mut world, Vec2::new(5.0, 0.0), ColliderConfig::default());

        let mut helper = ColliderTriggerHelper::new(mover);
        helper.update(&mut world).unwrap();
        assert_eq!(helper.current_triggers().count(), 0);
    }

    #[test]
    fn test_late_triggers_notified_last() {
        let mut world = PhysicsWorld::default();
        let (mover, _) = spawn(&mut world, Vec2::ZERO, ColliderConfig::default());
        let (_, late) = spawn(
            &mut world,
            Vec2::new(2.0, 0.0),
            ColliderConfig::trigger().with_cast_sort_order(10),
        );
        let (_, normal) = spawn(&mut world, Vec2::new(-2.0, 0.0), ColliderConfig::trigger());

        let events = Rc::new(RefCell::new(Vec::new()));
        world.add_trigger_listener(mover, Recorder(events.clone())).unwrap();

        let mut helper = ColliderTriggerHelper::new(mover).with_late_sort_order(5);
        helper.update(&mut world).unwrap();

        let others: Vec<ColliderId> = events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Enter(other, _) => Some(*other),
                Event::Exit(..) => None,
            })
            .collect();
        assert_eq!(others, vec![normal, late]);
    }

    #[test]
    fn test_removed_neighbor_still_exits() {
        let mut world = PhysicsWorld::default();
        let (mover, _) = spawn(&mut world, Vec2::ZERO, ColliderConfig::default());
        let (zone, _) = spawn(&mut world, Vec2::new(3.0, 0.0), ColliderConfig::trigger());

        let events = Rc::new(RefCell::new(Vec::new()));
        world.add_trigger_listener(mover, Recorder(events.clone())).unwrap();

        let mut helper = ColliderTriggerHelper::new(mover);
        helper.update(&mut world).unwrap();
        world.destroy_entity(zone).unwrap();
        helper.update(&mut world).unwrap();

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Event::Exit(..)));
    }
}
