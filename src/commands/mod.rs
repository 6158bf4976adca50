pub mod joystick_drive;
