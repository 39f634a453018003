use super::RgbColor;

/// The maximum number of binary layers a file can carry
pub const MAX_BINARIES: usize = 128;

/// Describes an auxiliary binary mask layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinaryDescriptor {
    pub name: String,
    /// Name of the component this layer is bound to, empty when unbound
    pub component_name: String,
    pub color: RgbColor,
}

impl BinaryDescriptor {
    pub fn new<S: Into<String>, T: Into<String>>(name: S, component_name: T, color: RgbColor) -> Self {
        Self {
            name: name.into(),
            component_name: component_name.into(),
            color,
        }
    }

    pub fn is_bound(&self) -> bool {
        !self.component_name.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Binaries {
    pub descriptors: Vec<BinaryDescriptor>,
}

impl Binaries {
    pub fn new(descriptors: Vec<BinaryDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BinaryDescriptor> {
        self.descriptors.iter()
    }
}
