fn main() {
  tally::main();
}
