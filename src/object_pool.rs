use crate::room::ArchetypeId;
use crate::scene::{off_stage, Poolable};
use std::collections::HashMap;

/// Recycles room instances per archetype. An instance is either held in a
/// free list here or owned by the caller, never both.
pub struct ObjectPool<T: Poolable> {
    free: HashMap<ArchetypeId, Vec<T>>,
    templates: HashMap<ArchetypeId, T>,
}

impl<T: Poolable> Default for ObjectPool<T> {
    fn default() -> Self {
        ObjectPool {
            free: HashMap::new(),
            templates: HashMap::new(),
        }
    }
}

impl<T: Poolable> ObjectPool<T> {
    /// Stores a hidden canonical instance that `acquire` clones on demand.
    pub fn register_template(&mut self, id: ArchetypeId, mut template: T) {
        park(&mut template);
        self.templates.insert(id, template);
    }

    pub fn has_template(&self, id: &ArchetypeId) -> bool {
        self.templates.contains_key(id)
    }

    /// Reuses a released instance, else clones the template. `None` means
    /// the asset has to be loaded first.
    pub fn acquire(&mut self, id: &ArchetypeId) -> Option<T> {
        if let Some(mut instance) = self.free.get_mut(id).and_then(Vec::pop) {
            instance.reparent(None);
            instance.set_visible(true);
            return Some(instance);
        }
        let mut instance = self.templates.get(id)?.duplicate();
        instance.reparent(None);
        instance.set_visible(true);
        Some(instance)
    }

    pub fn release(&mut self, id: ArchetypeId, mut instance: T) {
        park(&mut instance);
        self.free.entry(id).or_default().push(instance);
    }

    pub fn free_count(&self, id: &ArchetypeId) -> usize {
        self.free.get(id).map(Vec::len).unwrap_or(0)
    }

    /// Drops every pooled instance and template.
    pub fn clear(&mut self) {
        self.free.clear();
        self.templates.clear();
    }
}

fn park<T: Poolable>(instance: &mut T) {
    instance.reparent(None);
    instance.set_visible(false);
    instance.set_position(off_stage());
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scene::{RoomRenderable, SceneGroupId};
    use nalgebra::Vector3;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Stand-in scene node. Clones draw fresh ids from a shared counter.
    #[derive(Debug)]
    pub(crate) struct MockNode {
        pub id: u32,
        pub visible: bool,
        pub parent: Option<SceneGroupId>,
        pub position: Vector3<f32>,
        pub opacity: f32,
        next_id: Rc<Cell<u32>>,
    }

    impl MockNode {
        pub fn new(next_id: &Rc<Cell<u32>>) -> Self {
            let id = next_id.get();
            next_id.set(id + 1);
            MockNode {
                id,
                visible: true,
                parent: None,
                position: Vector3::zeros(),
                opacity: 1.0,
                next_id: Rc::clone(next_id),
            }
        }
    }

    impl Poolable for MockNode {
        fn duplicate(&self) -> Self {
            let mut copy = MockNode::new(&self.next_id);
            copy.visible = self.visible;
            copy.position = self.position;
            copy.opacity = self.opacity;
            copy
        }

        fn set_visible(&mut self, visible: bool) {
            self.visible = visible;
        }

        fn reparent(&mut self, parent: Option<SceneGroupId>) {
            self.parent = parent;
        }

        fn set_position(&mut self, position: Vector3<f32>) {
            self.position = position;
        }
    }

    impl RoomRenderable for MockNode {
        fn set_opacity(&mut self, opacity: f32) {
            self.opacity = opacity;
        }
    }

    const GARDEN: ArchetypeId = ArchetypeId::new("Garden");

    #[test]
    fn test_miss_without_template() {
        let mut pool: ObjectPool<MockNode> = ObjectPool::default();
        assert!(!pool.has_template(&GARDEN));
        assert!(pool.acquire(&GARDEN).is_none());
    }

    #[test]
    fn test_release_then_acquire_returns_same_instance() {
        let ids = Rc::new(Cell::new(0));
        let mut pool = ObjectPool::default();
        let mut node = MockNode::new(&ids);
        node.reparent(Some(SceneGroupId(1)));
        let id = node.id;

        pool.release(GARDEN, node);
        assert_eq!(pool.free_count(&GARDEN), 1);

        let reused = pool.acquire(&GARDEN).unwrap();
        assert_eq!(reused.id, id);
        assert!(reused.visible);
        assert_eq!(reused.parent, None);
        assert_eq!(pool.free_count(&GARDEN), 0);
    }

    #[test]
    fn test_template_is_cloned_and_hidden() {
        let ids = Rc::new(Cell::new(0));
        let mut pool = ObjectPool::default();
        let template = MockNode::new(&ids);
        let template_id = template.id;
        pool.register_template(GARDEN, template);
        assert!(pool.has_template(&GARDEN));

        let a = pool.acquire(&GARDEN).unwrap();
        let b = pool.acquire(&GARDEN).unwrap();
        assert_ne!(a.id, template_id);
        assert_ne!(a.id, b.id);
        assert!(a.visible && b.visible);
        let template = pool.templates.get(&GARDEN).unwrap();
        assert!(!template.visible);
        assert_eq!(template.position, off_stage());
    }

    #[test]
    fn test_released_instances_are_parked() {
        let ids = Rc::new(Cell::new(0));
        let mut pool = ObjectPool::default();
        let mut node = MockNode::new(&ids);
        node.set_position(Vector3::new(10.0, 0.0, 5.0));
        pool.release(GARDEN, node);
        let parked = &pool.free.get(&GARDEN).unwrap()[0];
        assert!(!parked.visible);
        assert_eq!(parked.parent, None);
        assert_eq!(parked.position, off_stage());

        pool.clear();
        assert_eq!(pool.free_count(&GARDEN), 0);
        assert!(!pool.has_template(&GARDEN));
    }
}
