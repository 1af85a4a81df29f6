//! Master-stack tiling layout.
//!
//! The layout is a pure function of the client count and the screen:
//! - One client fills the screen
//! - With more, client 0 (the master) takes the left half and the rest
//!   share the right half in equal horizontal slices, top to bottom
//!
//! Sizes use integer division. Leftover pixels at the right and bottom
//! edges stay unassigned.

use crate::types::Rect;

/// Calculate one rectangle per client, in registry order
pub fn master_stack(count: usize, screen: Rect) -> Vec<Rect> {
    match count {
        0 => Vec::new(),
        1 => vec![screen],
        n => {
            let half = screen.width / 2;
            let stack_len = (n - 1) as u32;
            let slice = screen.height / stack_len;

            let mut result = Vec::with_capacity(n);
            result.push(Rect::new(screen.x, screen.y, half, screen.height));
            for i in 0..stack_len {
                result.push(Rect::new(
                    screen.x + half as i32,
                    screen.y + (i * slice) as i32,
                    half,
                    slice,
                ));
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect {
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    };

    #[test]
    fn test_no_clients() {
        assert!(master_stack(0, SCREEN).is_empty());
    }

    #[test]
    fn test_single_client_fills_screen() {
        assert_eq!(master_stack(1, SCREEN), vec![Rect::new(0, 0, 1920, 1080)]);
    }

    #[test]
    fn test_two_clients_split_in_half() {
        assert_eq!(
            master_stack(2, SCREEN),
            vec![Rect::new(0, 0, 960, 1080), Rect::new(960, 0, 960, 1080)]
        );
    }

    #[test]
    fn test_stack_slices() {
        let rects = master_stack(4, SCREEN);
        assert_eq!(rects.len(), 4);
        assert_eq!(rects[0], Rect::new(0, 0, 960, 1080));
        assert_eq!(rects[1], Rect::new(960, 0, 960, 360));
        assert_eq!(rects[2], Rect::new(960, 360, 960, 360));
        assert_eq!(rects[3], Rect::new(960, 720, 960, 360));
    }

    #[test]
    fn test_truncation_leaves_remainder() {
        let screen = Rect::new(0, 0, 1001, 100);
        let rects = master_stack(4, screen);
        // 1001 / 2 = 500, 100 / 3 = 33
        assert_eq!(rects[0].width, 500);
        assert_eq!(rects[3], Rect::new(500, 66, 500, 33));
        // Bottom row of pixels is not covered
        assert_eq!(rects[3].y as u32 + rects[3].height, 99);
    }

    #[test]
    fn test_general_formula() {
        let (w, h) = (1280u32, 800u32);
        let screen = Rect::new(0, 0, w, h);
        for n in 2..12usize {
            let rects = master_stack(n, screen);
            assert_eq!(rects[0], Rect::new(0, 0, w / 2, h));
            let slice = h / (n as u32 - 1);
            for (i, rect) in rects.iter().enumerate().skip(1) {
                let expected = Rect::new((w / 2) as i32, ((i as u32 - 1) * slice) as i32, w / 2, slice);
                assert_eq!(*rect, expected, "client {} of {}", i, n);
            }
        }
    }

    #[test]
    fn test_screen_offset_respected() {
        let rects = master_stack(2, Rect::new(100, 50, 800, 600));
        assert_eq!(rects[0], Rect::new(100, 50, 400, 600));
        assert_eq!(rects[1], Rect::new(500, 50, 400, 600));
    }

    #[test]
    fn test_idempotent() {
        assert_eq!(master_stack(5, SCREEN), master_stack(5, SCREEN));
    }
}
