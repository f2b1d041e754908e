/// Move the element at `from` to `to`, clamping `to` to the last slot.
///
/// Mirrors a drag-and-drop list move: the element is taken out and
/// reinserted, shifting everything in between by one.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) {
  if from >= items.len() {
    return;
  }
  let item = items.remove(from);
  let to = to.min(items.len());
  items.insert(to, item);
}
