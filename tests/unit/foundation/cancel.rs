use super::*;

#[test]
fn clones_share_the_signal() {
    let token = CancelToken::new();
    let other = token.clone();
    assert!(token.check().is_ok());
    other.cancel();
    assert!(token.is_cancelled());
    assert!(matches!(token.check(), Err(StitchError::Cancelled)));
}
