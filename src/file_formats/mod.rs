pub mod animationfile;
pub mod meshfile;
