// This module contains all the MNIST-specific code in the project

mod load_mnist;
pub use load_mnist::{load_mnist, read_mnist, LoadOptions};

use crate::Pixel;

// Digit classes are 0-9
pub const N_CLASSES: u8 = 10;

// One image and its class. For queries the label is only used for scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledExample {
    pub label: u8,
    pub pixels: Vec<Pixel>,
}

impl LabeledExample {
    pub fn new(label: u8, pixels: Vec<Pixel>) -> Self {
        LabeledExample { label, pixels }
    }
}
