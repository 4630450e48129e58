fn main() {
    poolwork::main();
}
