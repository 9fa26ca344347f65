#![allow(clippy::cast_precision_loss, clippy::float_cmp)]

mod calibration;
mod perturbation;
mod sensitivity;
mod surrogate;
mod transform;
