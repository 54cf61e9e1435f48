//! Carving fragments out of a parent body.

use kinema_core::{KinemaError, KinemaResult, RigidBody};

/// Extracts selected elements of a body into a new body.
pub trait Divider {
    /// Remove the `selector` elements from `parent` and return them as `new_name`.
    ///
    /// The parent keeps its origin and its remaining elements.
    fn divide(&self, parent: &mut RigidBody, selector: &[usize], new_name: &str)
        -> KinemaResult<RigidBody>;
}

/// Divides by positional element index.
///
/// Indices are removed highest first, so the indices of later siblings that
/// select lower positions stay valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexDivider;

impl Divider for IndexDivider {
    fn divide(
        &self,
        parent: &mut RigidBody,
        selector: &[usize],
        new_name: &str,
    ) -> KinemaResult<RigidBody> {
        let mut indices = selector.to_vec();
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();

        if let Some(&index) = indices.first().filter(|&&i| i >= parent.len()) {
            return Err(KinemaError::SelectorOutOfRange {
                parent: parent.name.clone(),
                index,
                len: parent.len(),
            });
        }

        let mut carved: Vec<_> = indices.iter().map(|&i| parent.elements.remove(i)).collect();
        // Keep the parent's element order in the fragment.
        carved.reverse();
        Ok(RigidBody::new(new_name, carved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinema_core::{Element, Vec3};

    fn chain(n: usize) -> RigidBody {
        RigidBody::new(
            "chain",
            (0..n)
                .map(|i| Element::new("C", Vec3::new(i as f64, 0.0, 0.0)))
                .collect(),
        )
    }

    #[test]
    fn test_divide_carves_selected() {
        let mut parent = chain(5);
        let origin = parent.origin;
        let piece = IndexDivider.divide(&mut parent, &[3, 1], "piece").unwrap();
        assert_eq!(piece.name, "piece");
        assert_eq!(piece.elements[0].position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(piece.elements[1].position, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(piece.origin, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(parent.len(), 3);
        assert_eq!(parent.origin, origin);
    }

    #[test]
    fn test_highest_first_keeps_lower_indices_valid() {
        let mut parent = chain(10);
        let c = IndexDivider.divide(&mut parent, &[8], "c").unwrap();
        let b = IndexDivider.divide(&mut parent, &[3], "b").unwrap();
        assert_eq!(c.elements[0].position.x, 8.0);
        assert_eq!(b.elements[0].position.x, 3.0);
    }

    #[test]
    fn test_divide_out_of_range() {
        let mut parent = chain(3);
        let err = IndexDivider.divide(&mut parent, &[1, 7], "x").unwrap_err();
        assert!(matches!(
            err,
            KinemaError::SelectorOutOfRange { index: 7, len: 3, .. }
        ));
        assert_eq!(parent.len(), 3);
    }
}
