pub mod drivetrain;
