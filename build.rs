fn main() {
    // Propagates the ESP-IDF build environment when cross-compiling for the
    // device. On host builds there is no cached sysenv and this is a no-op.
    embuild::espidf::sysenv::output();
}
