/* List matching shared by record-of, set-of, permutation, superset and
 * subset templates
 *
 * All unordered cases reduce to one maximum bipartite matching between
 * template items and value elements. */

use std::ops::Range;

/* Size of a maximum matching between `left` and `right` items, where
 * `edge(l, r)` says whether they may be paired */
pub fn max_matching(left: usize, right: usize, mut edge: impl FnMut(usize, usize) -> bool) -> usize {
    let mut adjacency = Vec::with_capacity(left);
    for l in 0..left {
        let mut targets = Vec::new();
        for r in 0..right {
            if edge(l, r) {
                targets.push(r);
            }
        }
        adjacency.push(targets);
    }

    let mut owner: Vec<Option<usize>> = vec![None; right];
    let mut matched = 0;
    for l in 0..left {
        let mut seen = vec![false; right];
        if augment(l, &adjacency, &mut owner, &mut seen) {
            matched += 1;
        }
    }
    matched
}

fn augment(l: usize, adjacency: &[Vec<usize>], owner: &mut [Option<usize>], seen: &mut [bool]) -> bool {
    for &r in &adjacency[l] {
        if seen[r] {
            continue;
        }
        seen[r] = true;
        let free = match owner[r] {
            None => true,
            Some(other) => augment(other, adjacency, owner, seen),
        };
        if free {
            owner[r] = Some(l);
            return true;
        }
    }
    false
}

/* Every item pairs with a distinct element; stars absorb any leftovers,
 * without stars nothing may be left over */
pub fn match_unordered<I, E>(
    items: &[I],
    elements: &[E],
    is_star: impl Fn(&I) -> bool,
    matches: impl Fn(&I, &E) -> bool,
) -> bool {
    let fixed: Vec<&I> = items.iter().filter(|item| !is_star(*item)).collect();
    let has_star = fixed.len() != items.len();
    if fixed.len() > elements.len() || (!has_star && fixed.len() != elements.len()) {
        return false;
    }
    max_matching(fixed.len(), elements.len(), |l, r| matches(fixed[l], &elements[r])) == fixed.len()
}

/* Every item finds a distinct element; extra elements are allowed */
pub fn match_superset<I, E>(items: &[I], elements: &[E], matches: impl Fn(&I, &E) -> bool) -> bool {
    items.len() <= elements.len()
        && max_matching(items.len(), elements.len(), |l, r| matches(&items[l], &elements[r])) == items.len()
}

/* Every element finds a distinct item; extra items are allowed */
pub fn match_subset<I, E>(items: &[I], elements: &[E], matches: impl Fn(&I, &E) -> bool) -> bool {
    elements.len() <= items.len()
        && max_matching(elements.len(), items.len(), |l, r| matches(&items[r], &elements[l])) == elements.len()
}

/* Ordered list matching. Stars match zero or more elements, each
 * permutation group matches a contiguous run of elements in any order. */
pub fn match_ordered<I, E>(
    items: &[I],
    groups: &[Range<usize>],
    elements: &[E],
    is_star: impl Fn(&I) -> bool,
    matches: impl Fn(&I, &E) -> bool,
) -> bool {
    let mut matcher = OrderedMatcher {
        items,
        groups,
        elements,
        is_star: &is_star,
        matches: &matches,
        memo: vec![None; (items.len() + 1) * (elements.len() + 1)],
    };
    matcher.run(0, 0)
}

struct OrderedMatcher<'a, I, E> {
    items: &'a [I],
    groups: &'a [Range<usize>],
    elements: &'a [E],
    is_star: &'a dyn Fn(&I) -> bool,
    matches: &'a dyn Fn(&I, &E) -> bool,
    memo: Vec<Option<bool>>,
}

impl<I, E> OrderedMatcher<'_, I, E> {
    fn run(&mut self, item: usize, element: usize) -> bool {
        let key = item * (self.elements.len() + 1) + element;
        if let Some(known) = self.memo[key] {
            return known;
        }
        let result = self.step(item, element);
        self.memo[key] = Some(result);
        result
    }

    fn step(&mut self, item: usize, element: usize) -> bool {
        let (items, elements) = (self.items, self.elements);
        let (is_star, matches) = (self.is_star, self.matches);
        let remaining = elements.len() - element;
        if item == items.len() {
            return remaining == 0;
        }

        if let Some(group) = self.groups.iter().find(|group| group.start == item && !group.is_empty()).cloned() {
            let members = &items[group.clone()];
            let fixed = members.iter().filter(|member| !is_star(*member)).count();
            let widest = if fixed == members.len() { fixed } else { remaining };
            if fixed > remaining {
                return false;
            }
            for width in fixed..=widest.min(remaining) {
                let run = &elements[element..element + width];
                if match_unordered(members, run, is_star, matches) && self.run(group.end, element + width) {
                    return true;
                }
            }
            return false;
        }

        let current = &items[item];
        if is_star(current) {
            return self.run(item + 1, element) || (remaining > 0 && self.run(item, element + 1));
        }
        remaining > 0 && matches(current, &elements[element]) && self.run(item + 1, element + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAR: i32 = -1;

    fn is_star(item: &i32) -> bool {
        *item == STAR
    }

    fn equal(item: &i32, element: &i32) -> bool {
        item == element
    }

    #[test]
    fn matching_finds_augmenting_paths() {
        /* Greedy pairing of 0->0 would strand 1 */
        let edges = [[true, true], [true, false]];
        assert_eq!(max_matching(2, 2, |l, r| edges[l][r]), 2);
    }

    #[test]
    fn ordered_star_absorbs_runs() {
        assert!(match_ordered(&[1, STAR, 4], &[], &[1, 2, 3, 4], is_star, equal));
        assert!(match_ordered(&[1, STAR, 4], &[], &[1, 4], is_star, equal));
        assert!(!match_ordered(&[1, STAR, 4], &[], &[1, 2, 3], is_star, equal));
        assert!(match_ordered(&[STAR], &[], &[] as &[i32], is_star, equal));
    }

    #[test]
    fn permutation_group_matches_any_order() {
        let groups = [1..3];
        assert!(match_ordered(&[1, 2, 3, 4], &groups, &[1, 3, 2, 4], is_star, equal));
        assert!(!match_ordered(&[1, 2, 3, 4], &groups, &[3, 1, 2, 4], is_star, equal));
        let starred = [0..2];
        assert!(match_ordered(&[5, STAR, 9], &starred, &[7, 8, 5, 9], is_star, equal));
    }

    #[test]
    fn superset_and_subset_need_distinct_partners() {
        assert!(match_superset(&[1, 2], &[2, 3, 1], equal));
        assert!(!match_superset(&[1, 1], &[1, 2], equal));
        assert!(match_subset(&[1, 2, 3], &[3, 1], equal));
        assert!(!match_subset(&[1], &[1, 1], equal));
    }
}
