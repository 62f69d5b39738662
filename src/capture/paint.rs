//! Paint commands produced from captured strokes

use crate::capture::{Point, Rgba, Stroke};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    /// Cover the whole surface
    Fill { rgba: Rgba },
    /// A filled disc; single-point strokes become one of these
    Dot {
        center: Point,
        radius: f32,
        rgba: Rgba,
    },
    /// A round-capped line between two consecutive stroke points
    Segment {
        from: Point,
        to: Point,
        width: f32,
        rgba: Rgba,
    },
}

/// Translate strokes into paint commands, background first, strokes in the
/// order they were drawn.
pub fn paint_strokes(background: Rgba, strokes: &[Stroke]) -> Vec<PaintCommand> {
    let mut commands = vec![PaintCommand::Fill { rgba: background }];
    for stroke in strokes {
        match stroke.points.as_slice() {
            [] => {}
            [only] => commands.push(PaintCommand::Dot {
                center: *only,
                radius: stroke.width / 2.0,
                rgba: stroke.color,
            }),
            points => commands.extend(points.windows(2).map(|pair| PaintCommand::Segment {
                from: pair[0],
                to: pair[1],
                width: stroke.width,
                rgba: stroke.color,
            })),
        }
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(points: &[(f32, f32)]) -> Stroke {
        Stroke {
            color: (255, 255, 255, 255),
            width: 2.0,
            points: points.iter().map(|&(x, y)| Point { x, y }).collect(),
        }
    }

    #[test]
    fn single_point_becomes_dot() {
        let cmds = paint_strokes((0, 0, 0, 0), &[stroke(&[(5.0, 5.0)])]);
        assert_eq!(cmds.len(), 2);
        match &cmds[1] {
            PaintCommand::Dot { radius, .. } => assert_eq!(*radius, 1.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn polyline_becomes_segments() {
        let cmds = paint_strokes(
            (0, 0, 0, 0),
            &[stroke(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)])],
        );
        let segments = cmds
            .iter()
            .filter(|c| matches!(c, PaintCommand::Segment { .. }))
            .count();
        assert_eq!(segments, 2);
        assert!(matches!(cmds[0], PaintCommand::Fill { .. }));
    }
}
