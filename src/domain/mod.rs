pub mod classification;
pub mod progression;
pub mod track;
