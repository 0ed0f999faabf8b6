//! Per-object attribute value storage

use rdl2_sdk::{Timestep, NUM_TIMESTEPS};

use crate::attribute::{Attribute, AttributeValue};

#[derive(Debug, Clone)]
enum Slot {
    Single(AttributeValue),
    Blurred([AttributeValue; NUM_TIMESTEPS]),
}

/// One slot per declared attribute, two samples for blurrable ones
#[derive(Debug, Clone, Default)]
pub(crate) struct AttributeStorage {
    slots: Vec<Slot>,
}

impl AttributeStorage {
    /// Storage holding every attribute's default
    pub(crate) fn with_defaults<'a>(attributes: impl IntoIterator<Item = &'a Attribute>) -> Self {
        let slots = attributes
            .into_iter()
            .map(|attr| {
                let default = attr.default_attribute_value();
                if attr.is_blurrable() {
                    Slot::Blurred([default.clone(), default.clone()])
                } else {
                    Slot::Single(default.clone())
                }
            })
            .collect();
        Self { slots }
    }

    /// Non-blurrable slots ignore `timestep`
    pub(crate) fn get(&self, index: usize, timestep: Timestep) -> &AttributeValue {
        match &self.slots[index] {
            Slot::Single(value) => value,
            Slot::Blurred(values) => &values[timestep.index()],
        }
    }

    pub(crate) fn get_mut(&mut self, index: usize, timestep: Timestep) -> &mut AttributeValue {
        match &mut self.slots[index] {
            Slot::Single(value) => value,
            Slot::Blurred(values) => &mut values[timestep.index()],
        }
    }

    /// Store `value`, returning whether anything actually changed
    ///
    /// `None` writes every sample of a blurrable slot.
    pub(crate) fn set(&mut self, index: usize, timestep: Option<Timestep>, value: AttributeValue) -> bool {
        match (&mut self.slots[index], timestep) {
            (Slot::Single(current), _) => replace_if_changed(current, value),
            (Slot::Blurred(values), Some(ts)) => replace_if_changed(&mut values[ts.index()], value),
            (Slot::Blurred(values), None) => {
                let changed = values.iter().any(|v| *v != value);
                if changed {
                    values[1] = value.clone();
                    values[0] = value;
                }
                changed
            }
        }
    }

    /// Whether every sample of the slot equals `value`
    pub(crate) fn all_equal(&self, index: usize, value: &AttributeValue) -> bool {
        match &self.slots[index] {
            Slot::Single(current) => current == value,
            Slot::Blurred(values) => values.iter().all(|v| v == value),
        }
    }

    pub(crate) fn values(&self, index: usize) -> impl Iterator<Item = &AttributeValue> {
        let values: &[AttributeValue] = match &self.slots[index] {
            Slot::Single(value) => std::slice::from_ref(value),
            Slot::Blurred(values) => values,
        };
        values.iter()
    }

    /// Release every object reference so reference cycles can be dropped
    pub(crate) fn clear_objects(&mut self) {
        for slot in &mut self.slots {
            match slot {
                Slot::Single(value) => value.clear_objects(),
                Slot::Blurred(values) => values.iter_mut().for_each(AttributeValue::clear_objects),
            }
        }
    }
}

fn replace_if_changed(current: &mut AttributeValue, value: AttributeValue) -> bool {
    if *current == value {
        false
    } else {
        *current = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeFlags;
    use crate::interface::SceneObjectInterface;

    fn storage() -> AttributeStorage {
        let attrs = [
            Attribute::new("a", &[], AttributeValue::Int(1), 0, 0, AttributeFlags::empty(), SceneObjectInterface::GENERIC)
                .unwrap(),
            Attribute::new("b", &[], AttributeValue::Float(0.5), 1, 4, AttributeFlags::BLURRABLE, SceneObjectInterface::GENERIC)
                .unwrap(),
        ];
        AttributeStorage::with_defaults(&attrs)
    }

    #[test]
    fn test_defaults_fill_both_samples() {
        let s = storage();
        assert_eq!(s.get(0, Timestep::End), &AttributeValue::Int(1));
        assert_eq!(s.get(1, Timestep::Begin), &AttributeValue::Float(0.5));
        assert_eq!(s.get(1, Timestep::End), &AttributeValue::Float(0.5));
        assert_eq!(s.values(1).count(), 2);
    }

    #[test]
    fn test_set_reports_real_changes_only() {
        let mut s = storage();
        assert!(!s.set(0, None, AttributeValue::Int(1)));
        assert!(s.set(0, Some(Timestep::End), AttributeValue::Int(2)));
        assert_eq!(s.get(0, Timestep::Begin), &AttributeValue::Int(2));

        assert!(s.set(1, Some(Timestep::End), AttributeValue::Float(1.0)));
        assert_eq!(s.get(1, Timestep::Begin), &AttributeValue::Float(0.5));
        assert!(!s.all_equal(1, &AttributeValue::Float(0.5)));

        assert!(s.set(1, None, AttributeValue::Float(1.0)));
        assert!(s.all_equal(1, &AttributeValue::Float(1.0)));
        assert!(!s.set(1, None, AttributeValue::Float(1.0)));
    }
}
