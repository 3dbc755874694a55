/// 24-bit terminal colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

/// Two square tones of one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardTheme {
    pub dark: Rgb,
    pub light: Rgb,
}

const SATURATION: f64 = 0.70;

/// `(index * 14) mod 360`
pub fn slot_hue(index: usize) -> u16 {
    ((index * 14) % 360) as u16
}

/// 偶数は明るく、奇数は暗く
fn tone(index: usize) -> Rgb {
    let lightness = if index % 2 == 0 { 0.85 } else { 0.25 };
    hsl_to_rgb(slot_hue(index) as f64, SATURATION, lightness)
}

/// Dark squares take the slot's own tone, light squares the next slot's.
pub fn board_theme(index: usize) -> BoardTheme {
    BoardTheme {
        dark: tone(index),
        light: tone(index + 1),
    }
}

/// `h` in degrees, `s` and `l` in `0.0..=1.0`.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let h = (h % 360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(channel(r), channel(g), channel(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_hue() {
        assert_eq!(slot_hue(0), 0);
        assert_eq!(slot_hue(1), 14);
        assert_eq!(slot_hue(24), 336);
        assert_eq!(slot_hue(25), 350);
        assert_eq!(slot_hue(26), 4);
    }

    #[test]
    fn test_hsl_primaries() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), Rgb::new(255, 0, 0));
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), Rgb::new(0, 255, 0));
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), Rgb::new(0, 0, 255));
        assert_eq!(hsl_to_rgb(0.0, 0.0, 1.0), Rgb::WHITE);
        assert_eq!(hsl_to_rgb(0.0, 0.0, 0.0), Rgb::BLACK);
    }

    #[test]
    fn test_board_theme() {
        let theme = board_theme(0);
        // hsl(0, 70%, 85%) / hsl(14, 70%, 25%)
        assert_eq!(theme.dark, Rgb::new(244, 190, 190));
        assert_eq!(theme.light, Rgb::new(108, 40, 19));

        // 奇数スロットは明暗が入れ替わる
        let odd = board_theme(1);
        assert_eq!(odd.dark, theme.light);
        // hsl(14, 70%, 25%) / hsl(28, 70%, 85%)
        assert_eq!(odd.light, Rgb::new(244, 215, 190));

        // hsl(350, 70%, 25%) / hsl(4, 70%, 85%)
        let wrapped = board_theme(25);
        assert_eq!(wrapped.dark, Rgb::new(108, 19, 34));
        assert_eq!(wrapped.light, Rgb::new(244, 194, 190));
    }

    #[test]
    fn test_theme_is_deterministic() {
        for i in 0..25 {
            assert_eq!(board_theme(i), board_theme(i));
        }
        assert_ne!(board_theme(2), board_theme(4));
    }
}
