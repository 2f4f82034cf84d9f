#![warn(missing_docs)]
//! Shorthand macros for creating [`Length`](uom::si::f64::Length) values

/// create a Length in meter
#[macro_export]
macro_rules! meter {
    ($x:expr) => {
        uom::si::f64::Length::new::<uom::si::length::meter>($x)
    };
}
/// create a Length in millimeter
#[macro_export]
macro_rules! millimeter {
    ($x:expr) => {
        uom::si::f64::Length::new::<uom::si::length::millimeter>($x)
    };
}
/// create a Length in micrometer
#[macro_export]
macro_rules! micrometer {
    ($x:expr) => {
        uom::si::f64::Length::new::<uom::si::length::micrometer>($x)
    };
}
/// create a Length in nanometer
#[macro_export]
macro_rules! nanometer {
    ($x:expr) => {
        uom::si::f64::Length::new::<uom::si::length::nanometer>($x)
    };
}
