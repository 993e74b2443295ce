/// Visits the combinations of `n` out of `items` in lexicographic order and returns the first
/// one accepted by `accept`.
///
/// Each step either includes the current item and picks `n - 1` from the rest, or skips it
/// and picks `n` from the rest.
pub fn first_combination<T: Clone>(
    items: &[T],
    n: usize,
    mut accept: impl FnMut(&[T]) -> bool,
) -> Option<Vec<T>> {
    if n > items.len() {
        return None;
    }
    let mut chosen = Vec::with_capacity(n);
    if search(items, n, &mut chosen, &mut accept) {
        Some(chosen)
    } else {
        None
    }
}

fn search<T: Clone>(
    rest: &[T],
    n: usize,
    chosen: &mut Vec<T>,
    accept: &mut impl FnMut(&[T]) -> bool,
) -> bool {
    if n == 0 {
        return accept(chosen);
    }
    if rest.len() < n {
        return false;
    }
    if rest.len() == n {
        let mark = chosen.len();
        chosen.extend_from_slice(rest);
        if accept(chosen) {
            return true;
        }
        chosen.truncate(mark);
        return false;
    }
    chosen.push(rest[0].clone());
    if search(&rest[1..], n - 1, chosen, accept) {
        return true;
    }
    chosen.pop();
    search(&rest[1..], n, chosen, accept)
}
