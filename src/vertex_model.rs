use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::geometry::{GeometryType, WorldPoint};

/// A vertex chain as seen at one point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexChain {
    pub vertices: Vec<WorldPoint>,
    /// Index of the vertex being edited, if any.
    pub current_index: Option<usize>,
    pub geometry_type: GeometryType,
}

impl VertexChain {
    pub fn current_vertex(&self) -> Option<WorldPoint> {
        self.current_index.and_then(|i| self.vertices.get(i).copied())
    }

    /// Vertices other than the current one, in chain order.
    pub fn committed(&self) -> impl Iterator<Item = WorldPoint> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(move |(i, _)| Some(*i) != self.current_index)
            .map(|(_, p)| *p)
    }
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum VertexModelError {
    #[error("vertex index {index} out of range for chain of {len} vertices")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A shared, editable vertex chain.
///
/// Cloning the handle shares the chain: the editing session mutates it while
/// overlays read it. Every mutation bumps a version counter so readers can
/// tell whether the chain changed since they last looked.
#[derive(Clone, Debug)]
pub struct VertexModel {
    inner: Arc<RwLock<VertexModelInner>>,
}

#[derive(Debug)]
struct VertexModelInner {
    chain: VertexChain,
    /// Version counter to detect changes
    version: u64,
}

impl VertexModel {
    /// Create an empty chain for geometries of the given type.
    pub fn new(geometry_type: GeometryType) -> Self {
        Self {
            inner: Arc::new(RwLock::new(VertexModelInner {
                chain: VertexChain {
                    geometry_type,
                    ..VertexChain::default()
                },
                version: 0,
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, VertexModelInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VertexModelInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to the chain and bump the version.
    fn mutate<R>(&self, f: impl FnOnce(&mut VertexChain) -> R) -> R {
        let mut inner = self.write();
        let out = f(&mut inner.chain);
        inner.version = inner.version.wrapping_add(1);
        out
    }

    /// Apply a fallible edit; the version only moves when it succeeds.
    fn try_mutate<R, E>(&self, f: impl FnOnce(&mut VertexChain) -> Result<R, E>) -> Result<R, E> {
        let mut inner = self.write();
        let out = f(&mut inner.chain)?;
        inner.version = inner.version.wrapping_add(1);
        Ok(out)
    }

    pub fn snapshot(&self) -> VertexChain {
        self.read().chain.clone()
    }

    pub fn version(&self) -> u64 {
        self.read().version
    }

    pub fn len(&self) -> usize {
        self.read().chain.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.read().chain.geometry_type
    }

    pub fn current_index(&self) -> Option<usize> {
        self.read().chain.current_index
    }

    pub fn set_geometry_type(&self, geometry_type: GeometryType) {
        self.mutate(|c| c.geometry_type = geometry_type);
    }

    /// Append a committed vertex.
    pub fn push(&self, p: WorldPoint) {
        self.mutate(|c| {
            // Keep the current vertex at the tail while drawing.
            match c.current_index {
                Some(i) if i + 1 == c.vertices.len() => {
                    c.vertices.insert(i, p);
                    c.current_index = Some(i + 1);
                }
                _ => c.vertices.push(p),
            }
        });
    }

    /// Move the current vertex to `p`, appending one if there is none.
    pub fn set_current_coordinate(&self, p: WorldPoint) {
        self.mutate(|c| match c.current_index {
            Some(i) => c.vertices[i] = p,
            None => {
                c.vertices.push(p);
                c.current_index = Some(c.vertices.len() - 1);
            }
        });
    }

    /// Mark vertex `index` as the one being edited, or clear the marker.
    pub fn set_current_index(&self, index: Option<usize>) -> Result<(), VertexModelError> {
        self.try_mutate(|c| {
            if let Some(i) = index
                && i >= c.vertices.len()
            {
                return Err(VertexModelError::IndexOutOfRange {
                    index: i,
                    len: c.vertices.len(),
                });
            }
            c.current_index = index;
            Ok(())
        })
    }

    /// Turn the current vertex into a committed one.
    pub fn commit_current(&self) {
        self.mutate(|c| c.current_index = None);
    }

    pub fn move_vertex(&self, index: usize, p: WorldPoint) -> Result<(), VertexModelError> {
        self.try_mutate(|c| {
            let len = c.vertices.len();
            let v = c
                .vertices
                .get_mut(index)
                .ok_or(VertexModelError::IndexOutOfRange { index, len })?;
            *v = p;
            Ok(())
        })
    }

    pub fn insert(&self, index: usize, p: WorldPoint) -> Result<(), VertexModelError> {
        self.try_mutate(|c| {
            let len = c.vertices.len();
            if index > len {
                return Err(VertexModelError::IndexOutOfRange { index, len });
            }
            c.vertices.insert(index, p);
            if let Some(cur) = c.current_index
                && cur >= index
            {
                c.current_index = Some(cur + 1);
            }
            Ok(())
        })
    }

    pub fn remove(&self, index: usize) -> Result<WorldPoint, VertexModelError> {
        self.try_mutate(|c| {
            let len = c.vertices.len();
            if index >= len {
                return Err(VertexModelError::IndexOutOfRange { index, len });
            }
            let removed = c.vertices.remove(index);
            c.current_index = match c.current_index {
                Some(cur) if cur == index => None,
                Some(cur) if cur > index => Some(cur - 1),
                other => other,
            };
            Ok(removed)
        })
    }

    /// Remove every vertex, keeping the geometry type.
    pub fn clear(&self) {
        self.mutate(|c| {
            c.vertices.clear();
            c.current_index = None;
        });
    }
}

impl Default for VertexModel {
    fn default() -> Self {
        Self::new(GeometryType::Line)
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::*;

    #[test]
    fn clones_share_the_chain_and_version() {
        let model = VertexModel::new(GeometryType::Polygon);
        let reader = model.clone();
        let v0 = reader.version();

        model.push(DVec2::new(1.0, 2.0));
        assert_eq!(reader.len(), 1);
        assert!(reader.version() > v0);
        assert_eq!(reader.geometry_type(), GeometryType::Polygon);
    }

    #[test]
    fn pushing_keeps_current_vertex_last() {
        let model = VertexModel::default();
        model.push(DVec2::new(0.0, 0.0));
        model.set_current_coordinate(DVec2::new(5.0, 5.0));
        model.push(DVec2::new(1.0, 0.0));

        let chain = model.snapshot();
        assert_eq!(chain.current_index, Some(2));
        assert_eq!(chain.current_vertex(), Some(DVec2::new(5.0, 5.0)));
        assert_eq!(
            chain.committed().collect::<Vec<_>>(),
            vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0)]
        );

        model.set_current_coordinate(DVec2::new(6.0, 6.0));
        assert_eq!(model.snapshot().vertices[2], DVec2::new(6.0, 6.0));
        assert_eq!(model.len(), 3);
    }

    #[test]
    fn removal_and_insertion_track_current_index() {
        let model = VertexModel::default();
        for i in 0..4 {
            model.push(DVec2::new(i as f64, 0.0));
        }
        model.set_current_index(Some(2)).unwrap();

        model.insert(0, DVec2::new(-1.0, 0.0)).unwrap();
        assert_eq!(model.current_index(), Some(3));

        model.remove(1).unwrap();
        assert_eq!(model.current_index(), Some(2));

        model.remove(2).unwrap();
        assert_eq!(model.current_index(), None);

        assert_eq!(
            model.remove(10),
            Err(VertexModelError::IndexOutOfRange { index: 10, len: 3 })
        );
        assert!(model.set_current_index(Some(3)).is_err());
    }

    #[test]
    fn rejected_edits_keep_the_version() {
        let model = VertexModel::default();
        model.push(DVec2::ZERO);
        let version = model.version();

        assert!(model.move_vertex(1, DVec2::ONE).is_err());
        assert!(model.insert(5, DVec2::ONE).is_err());
        assert!(model.remove(1).is_err());
        assert!(model.set_current_index(Some(1)).is_err());
        assert_eq!(model.version(), version);

        model.move_vertex(0, DVec2::ONE).unwrap();
        assert_eq!(model.version(), version + 1);
    }

    #[test]
    fn commit_and_clear() {
        let model = VertexModel::default();
        model.set_current_coordinate(DVec2::ONE);
        model.commit_current();
        assert_eq!(model.current_index(), None);
        assert_eq!(model.len(), 1);

        model.move_vertex(0, DVec2::ZERO).unwrap();
        assert_eq!(model.snapshot().vertices, vec![DVec2::ZERO]);

        model.clear();
        assert!(model.is_empty());
        assert_eq!(model.geometry_type(), GeometryType::Line);
    }
}
