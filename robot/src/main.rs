#![cfg_attr(target_os = "vexos", no_std, no_main)]

#[cfg(not(target_os = "vexos"))]
mod sim;
#[cfg(target_os = "vexos")]
mod v5;

#[cfg(not(target_os = "vexos"))]
fn main() {
    sim::run();
}
