const OPENING: [char; 4] = ['<', '(', '{', '['];
const CLOSING: [char; 4] = ['>', ')', '}', ']'];

/// True when every bracket in `text` is closed by its own kind in order.
pub fn check_brackets(text: &str) -> bool {
    let mut stack = Vec::new();
    for ch in text.chars() {
        if OPENING.contains(&ch) {
            stack.push(ch);
        } else if let Some(index) = CLOSING.iter().position(|close| *close == ch) {
            if stack.pop() != Some(OPENING[index]) {
                return false;
            }
        }
    }
    stack.is_empty()
}

#[cfg(test)]
mod brackets_tests {
    use super::*;

    #[test]
    fn balanced_and_unbalanced_inputs() {
        assert!(check_brackets("[A(B)]"));
        assert!(!check_brackets("[A(B]"));
        assert!(check_brackets(""));
        assert!(!check_brackets("]"));
        assert!(!check_brackets("(("));
        assert!(!check_brackets("(]"));
        assert!(check_brackets("<{[()]}>"));
    }

    #[test]
    fn conditions_with_text_between_brackets() {
        assert!(check_brackets(
            "[Player.HasVideo + !Skin.HasSetting(HideInfo)] | Window.IsActive(home)"
        ));
        assert!(!check_brackets("[Player.HasVideo"));
        assert!(!check_brackets("String.IsEqual(ListItem.Label,foo))"));
    }
}
